//! Responses written when the bridge fails before any output

use interlink_common::BridgeError;

const UNAVAILABLE_PAGE: &str = "<!DOCTYPE html>\n\
<html><head><title>503 Service Unavailable</title></head>\n\
<body><h1>Service Unavailable</h1>\n\
<p>The application server is not answering. Please try again in a few moments.</p>\n\
</body></html>\n";

/// CGI response (head and body) for a fatal bridge error.
pub fn render(err: &BridgeError) -> String {
    match err.status_hint() {
        503 => format!(
            "Status: 503 Service Unavailable\r\nContent-Type: text/html\r\nRetry-After: 10\r\n\r\n{UNAVAILABLE_PAGE}"
        ),
        504 => "Status: 504 Gateway Timeout\r\nContent-Type: text/plain\r\n\r\nThe application server did not answer in time.\n".to_string(),
        _ => "Status: 500 Internal Server Error\r\nContent-Type: text/plain\r\n\r\nThe request could not be passed to the application server.\n".to_string(),
    }
}
