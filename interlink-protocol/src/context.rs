//! Per-request identity handed to the backend

use bytes::Bytes;

/// Arguments, environment and optional body of one request.
///
/// Built once by an adapter, then only read. Keys and values are raw bytes
/// so that a process environment that is not valid UTF-8 still reaches the
/// backend unchanged. Environment insertion order is preserved; setting an
/// existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    args: Vec<Bytes>,
    env: Vec<(Bytes, Bytes)>,
    body: Option<Bytes>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments in order.
    #[must_use]
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment entry.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.set_env(key, value);
        self
    }

    /// Attach a request body. An empty body still produces an `entity` block.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn set_env(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.env.push((key, value)),
        }
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn env(&self) -> &[(Bytes, Bytes)] {
        &self.env
    }

    pub fn env_value(&self, key: &str) -> Option<&Bytes> {
        self.env
            .iter()
            .find(|(k, _)| k.as_ref() == key.as_bytes())
            .map(|(_, v)| v)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}
