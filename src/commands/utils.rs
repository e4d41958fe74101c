use crate::utils::config::SCHEMA_VERSION;

/// Display version information
pub fn display_version() {
    println!("Tarmac Annotate v{}", env!("CARGO_PKG_VERSION"));
    println!("Run Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Annotates Tarmac instruction traces with call trees, prototypes and watched accesses.");
}
