//! Output formatting utilities.

use colored::Colorize;
use guild_contracts::ONE_TOKEN;
use guild_governance::ProposalState;
use guild_types::{Address, Hash};

/// Format address (short version).
pub fn format_address_short(addr: &Address) -> String {
    let s = addr.to_string();
    if s.len() > 16 {
        format!("{}...{}", &s[..12], &s[s.len() - 6..])
    } else {
        s
    }
}

/// Format a hash in full.
pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

/// Format base units as MKT.
pub fn format_mkt(units: u128) -> String {
    let whole = units / ONE_TOKEN;
    let frac = units % ONE_TOKEN;
    if frac == 0 {
        format!("{} MKT", whole)
    } else {
        let frac = format!("{:018}", frac);
        format!("{}.{} MKT", whole, frac.trim_end_matches('0'))
    }
}

/// Format a proposal state with its numeric code.
pub fn format_state(state: ProposalState) -> String {
    let label = format!("{} ({})", state.name(), state.code());
    match state {
        ProposalState::Succeeded | ProposalState::Executed => label.green().to_string(),
        ProposalState::Defeated | ProposalState::Canceled | ProposalState::Expired => {
            label.red().to_string()
        }
        ProposalState::Queued => label.cyan().to_string(),
        ProposalState::Pending | ProposalState::Active => label.yellow().to_string(),
    }
}

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print a labelled field.
pub fn print_field(label: &str, value: &str) {
    println!("  {:<18} {}", format!("{}:", label).bold(), value);
}
