//! JSON-RPC method names understood by the server.

/// A parsed JSON-RPC method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum McpMethod {
    /// `initialize`
    Initialize,
    /// `notifications/initialized`, sent by the client after `initialize`.
    Initialized,
    /// `tools/list`
    ListTools,
    /// `tools/call`
    CallTool,
    /// `ping`
    Ping,
    /// Anything else; answered with "method not found".
    Unknown(String),
}

impl From<&str> for McpMethod {
    fn from(method: &str) -> Self {
        match method {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "ping" => Self::Ping,
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("initialize", McpMethod::Initialize; "initialize")]
    #[test_case("notifications/initialized", McpMethod::Initialized; "initialized notification")]
    #[test_case("tools/list", McpMethod::ListTools; "list tools")]
    #[test_case("tools/call", McpMethod::CallTool; "call tool")]
    #[test_case("ping", McpMethod::Ping; "ping")]
    fn test_parses_known_method(name: &str, expected: McpMethod) {
        assert_eq!(McpMethod::from(name), expected);
    }

    #[test_case("resources/list"; "unsupported capability")]
    #[test_case("Tools/List"; "case sensitive")]
    #[test_case(""; "empty")]
    fn test_keeps_unknown_method_name(name: &str) {
        assert_eq!(McpMethod::from(name), McpMethod::Unknown(name.to_string()));
    }
}
