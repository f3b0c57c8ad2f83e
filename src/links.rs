//! Deep links into the log console

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except the URI-component unreserved set `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn escape_component(text: &str) -> String {
    utf8_percent_encode(text, URI_COMPONENT).to_string()
}

/// Escape text for the console's fragment router
///
/// The console nests one encoded URL inside another, so the text is escaped
/// twice and the remaining `%` signs become `$`.
pub fn console_escape(text: &str) -> String {
    escape_component(&escape_component(text)).replace('%', "$")
}

/// Link to one log stream of one log group
pub fn console_link(region: &str, log_group: &str, log_stream: &str) -> String {
    format!(
        "https://{region}.console.aws.amazon.com/cloudwatch/home?region={region}#logsV2:log-groups/log-group/{}/log-events/{}",
        console_escape(log_group),
        console_escape(log_stream),
    )
}
