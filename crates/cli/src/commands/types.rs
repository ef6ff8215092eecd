use anyhow::Result;
use portal_sessions_core::SessionTypes;

/// Print the recognized session types, one per line.
pub(crate) fn run() -> Result<()> {
    let types = SessionTypes::from_env()?;
    for session_type in types.iter() {
        println!("{session_type}");
    }
    Ok(())
}
