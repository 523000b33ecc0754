//! Configuration doubles, one per bootstrap path the suites exercise.

use std::sync::Arc;

use ortho_config::OrthoError;
use tempfile::TempDir;

use courier_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// A canned configuration source.
pub enum ScenarioConfig {
    /// Unix socket inside a private temporary directory.
    PrivateUnix(TempDir),
    /// Ephemeral port on 127.0.0.1.
    Loopback,
    /// `--listen-socket` names a scheme the daemon does not serve.
    RejectedFlag,
    /// A plain file occupies the socket's parent directory.
    BlockedDirectory(TempDir),
}

impl ScenarioConfig {
    #[must_use]
    pub fn private_unix() -> Self {
        Self::PrivateUnix(scratch())
    }

    #[must_use]
    pub fn blocked_directory() -> Self {
        let root = scratch();
        std::fs::write(root.path().join("occupied"), b"plain file").expect("write occupying file");
        Self::BlockedDirectory(root)
    }
}

fn scratch() -> TempDir {
    TempDir::new().expect("scenario directory")
}

fn unix_under(root: &TempDir, segments: &[&str]) -> SocketEndpoint {
    let path = segments
        .iter()
        .fold(root.path().to_path_buf(), |path, segment| path.join(segment));
    SocketEndpoint::unix(path.to_str().expect("utf8 socket path"))
}

impl ConfigLoader for ScenarioConfig {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let listen_socket = match self {
            Self::PrivateUnix(root) => unix_under(root, &["run", "courierd.sock"]),
            Self::Loopback => SocketEndpoint::tcp("127.0.0.1", 0),
            Self::RejectedFlag => {
                return Config::load_from_iter(["courierd", "--listen-socket", "invalid://socket"]);
            }
            Self::BlockedDirectory(root) => {
                unix_under(root, &["occupied", "nested", "courierd.sock"])
            }
        };
        Ok(Config {
            listen_socket,
            ..Config::default()
        })
    }
}
