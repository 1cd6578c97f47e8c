//! Merging of partial reference/value tuples.

use crate::error::{CoreError, Result};
use crate::value::Value;

/// Merge `new` reference/value pairs into `old` ones.
///
/// The result is ordered like `all_refs` and contains every reference present
/// in either input; where both address the same reference the new value wins.
pub fn merge_ref_values(
    all_refs: &[u32],
    old_refs: &[u32],
    old_values: &[Value],
    new_refs: &[u32],
    new_values: &[Value],
) -> Result<(Vec<u32>, Vec<Value>)> {
    for (refs, values) in [(old_refs, old_values), (new_refs, new_values)] {
        if refs.len() != values.len() {
            return Err(CoreError::LengthMismatch {
                refs: refs.len(),
                values: values.len(),
            });
        }
        if let Some(r) = refs.iter().find(|r| !all_refs.contains(r)) {
            return Err(CoreError::UnknownReference(*r));
        }
    }

    let mut refs = Vec::new();
    let mut values = Vec::new();
    for r in all_refs {
        let value = match new_refs.iter().position(|n| n == r) {
            Some(i) => &new_values[i],
            None => match old_refs.iter().position(|o| o == r) {
                Some(i) => &old_values[i],
                None => continue,
            },
        };
        refs.push(*r);
        values.push(value.clone());
    }
    Ok((refs, values))
}
