//! Port for the user/group database.

use nix::unistd::{Gid, Uid};

use crate::error::AppError;

/// Name → id resolution and group creation.
pub trait UserDb: Send + Sync {
    /// Derives the system user name owning an application.
    ///
    /// The default prefixes the app name with `app`; adapters with bounded
    /// name buffers report overflow as [`AppError::ConfigOverflow`].
    fn app_user_name(&self, app_name: &str) -> Result<String, AppError> {
        Ok(format!("app{app_name}"))
    }

    /// Resolves the uid and primary gid of a user.
    fn ids_of(&self, user_name: &str) -> Result<(Uid, Gid), AppError>;

    /// Creates the group if needed and returns its gid.
    fn create_group(&self, group_name: &str) -> Result<Gid, AppError>;
}
