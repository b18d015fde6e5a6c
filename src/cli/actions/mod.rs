use secrecy::SecretString;
use std::path::PathBuf;

pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        keys_dir: PathBuf,
        session_secret: SecretString,
        session_ttl: u64,
    },
}
