//! Password hash command.

use loyalty_api::services::auth::hash::sha256_hex;

/// Print `password`'s digest in the `sha256:<hex>` form `PASSWORD_HASH`
/// accepts.
pub fn hash(password: &str) {
    if password.trim() != password {
        tracing::warn!("Password has leading or trailing whitespace; it is hashed as given");
    }

    #[allow(clippy::print_stdout)]
    {
        println!("{}", format_hash(password));
    }
}

fn format_hash(password: &str) -> String {
    format!("sha256:{}", sha256_hex(password))
}
