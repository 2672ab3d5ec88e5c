//! String formatting utilities for log output.

/// Truncates a hex string for display purposes.
///
/// Shows only the first 10 characters (enough for `0x` plus 8 digits)
/// followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Formats an amount in the smallest currency unit with thousands separators.
pub fn display_planck(amount: u128) -> String {
	let digits = amount.to_string();
	let mut out = String::with_capacity(digits.len() + digits.len() / 3);
	for (i, c) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			out.push('_');
		}
		out.push(c);
	}
	out
}
