//! Port for the SMACK mandatory-access-control layer.
//!
//! Application labels are derived from the app name with the `app.` prefix.
//! Access labels tag an app's permission-scoped folders by appending the
//! mode characters; [`SmackCtl::access_label`] canonicalizes whatever the
//! caller passes into `r`, `w`, `x` order (an empty mode reads as `-`), so
//! the label is the same however the permissions were spelled. The
//! derivations have default implementations so adapters only override them
//! when the platform labels differ.

/// Label the framework itself runs under.
pub const FRAMEWORK_LABEL: &str = "framework";

/// SMACK label and rule control.
pub trait SmackCtl: Send + Sync {
    /// Sets (or replaces) the rule `subject --perms--> object`.
    ///
    /// Rule installation is fire-and-forget: the kernel write either takes
    /// effect or the adapter dies loudly; the core never branches on it.
    fn set_rule(&self, subject: &str, perms: &str, object: &str);

    /// Revokes every rule whose subject is `label`.
    fn revoke_subject(&self, label: &str);

    /// The application's own label.
    fn label(&self, app_name: &str) -> String {
        format!("app.{app_name}")
    }

    /// The label of the app's folder tagged with `perms`.
    ///
    /// The mode characters are canonicalized into `r`, `w`, `x` order
    /// regardless of how `perms` spells them; characters outside that set
    /// are ignored, and an empty mode is rendered as `-`.
    fn access_label(&self, app_name: &str, perms: &str) -> String {
        let mut mode = String::with_capacity(3);
        for flag in ['r', 'w', 'x'] {
            if perms.contains(flag) {
                mode.push(flag);
            }
        }
        if mode.is_empty() {
            mode.push('-');
        }
        format!("{}{mode}", self.label(app_name))
    }
}
