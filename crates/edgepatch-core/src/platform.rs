use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl Platform {
    pub fn current() -> Result<Self> {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::MacOs),
            _ => Err(anyhow!("unsupported platform: {os}")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        }
    }

    pub fn home_var(self) -> &'static str {
        match self {
            Self::Windows => "USERPROFILE",
            Self::Linux | Self::MacOs => "HOME",
        }
    }

    /// Resolves the user's home directory from the platform's home variable.
    pub fn home_dir(self) -> Result<PathBuf> {
        let var = self.home_var();
        let value = std::env::var(var)
            .with_context(|| format!("{var} is not set; cannot resolve browser user data"))?;
        if value.trim().is_empty() {
            return Err(anyhow!("{var} is empty; cannot resolve browser user data"));
        }
        Ok(PathBuf::from(value))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
