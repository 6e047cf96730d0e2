/// directory admin - managing identities against a file store
use loan_desk_rs::{DeskConfig, DeskError, FileStore, IdentityUpdate, LoanDesk, NewIdentity, Role};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== directory admin ===\n");

    let dir = std::env::temp_dir().join(format!("loan-desk-demo-{}", std::process::id()));
    let mut desk = LoanDesk::open(FileStore::open(&dir)?, DeskConfig::demo())?;

    let me = desk.authenticate("admin@example.com", "password")?;
    let added = desk.add_identity(NewIdentity::new("Robert Downey", "robert@example.com", Role::Verifier))?;
    desk.update_identity(added.id, IdentityUpdate::new().role(Role::Admin))?;

    match desk.add_identity(NewIdentity::new("Copy", "ROBERT@example.com", Role::Borrower)) {
        Err(e @ DeskError::DuplicateEmail { .. }) => println!("duplicate:     {e}"),
        other => println!("unexpected: {other:?}"),
    }
    match desk.delete_identity(me.id) {
        Err(e @ DeskError::SelfDeletion) => println!("self delete:   {e}"),
        other => println!("unexpected: {other:?}"),
    }

    println!("\nadmins:");
    for view in desk.identity_views().iter().filter(|v| v.role == Role::Admin) {
        println!("  {:<15} {:<22} deletable={}", view.name, view.email, view.can_delete);
    }

    // reopen from disk; directory and session come back
    let reopened = LoanDesk::open(desk.into_store(), DeskConfig::demo())?;
    println!(
        "\nafter restart: {} identities, signed in as {:?}",
        reopened.list_identities().len(),
        reopened.current_identity().map(|i| i.display_name.as_str())
    );

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
