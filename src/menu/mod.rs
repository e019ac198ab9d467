//! Interactive menu over the stack commands

#[cfg(feature = "menu")]
pub mod interactive;

#[cfg(feature = "menu")]
pub use interactive::run_menu;

#[cfg(not(feature = "menu"))]
pub fn run_menu<R: crate::compose::CommandRunner>(
    _session: &crate::cli::Session<R>,
    _clock: &dyn crate::readiness::Clock,
) -> crate::error::Result<()> {
    Err(crate::error::PortalError::Interactive(
        "Menu not enabled. Rebuild with --features menu".to_string(),
    ))
}
