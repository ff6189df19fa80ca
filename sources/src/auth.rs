use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Describe the possible ways to authenticate oneself
///
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Auth {
    /// Nothing special, no auth
    #[default]
    Anon,
    /// Using an API key supplied through a header
    Key { api_key: String },
    /// Using an opaque per-session bearer token
    Token { token: String },
}

impl Auth {
    /// The credential string to put on the wire, empty for `Anon`.
    ///
    pub fn secret(&self) -> &str {
        match self {
            Auth::Anon => "",
            Auth::Key { api_key } => api_key,
            Auth::Token { token } => token,
        }
    }
}

impl Display for Auth {
    /// Obfuscate the keys & tokens
    ///
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Hide tokens & API keys
        //
        let auth = match self.clone() {
            Auth::Key { .. } => Auth::Key {
                api_key: "HIDDEN".to_string(),
            },
            Auth::Token { .. } => Auth::Token {
                token: "HIDDEN".to_string(),
            },
            _ => Auth::Anon,
        };
        write!(f, "{:?}", auth)
    }
}
