use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;

const NAME_PREFIX: &str = "User_";
const TOKEN_LEN: usize = 4;

/// Display identity handed to a session when it connects.
///
/// Names are four random alphanumerics, so two sessions can collide. The
/// identity only decorates output and carries no authentication meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    name: String,
    color: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let color = format!("#{:06X}", rng.gen_range(0..0xFFFFFF));
        Self::new(format!("{}{}", NAME_PREFIX, token), color)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    /// HTML label shown in front of this session's messages.
    pub fn label(&self) -> String {
        format!(
            "<span style=\"color: {}; font-weight: bold;\">{}</span>",
            self.color, self.name
        )
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
