pub mod binding;
pub mod call;
pub mod config;
pub mod ipc;

pub use binding::BindingError;
pub use call::CallError;
pub use config::ConfigError;
pub use ipc::IpcError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
