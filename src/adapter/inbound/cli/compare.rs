//! Handler for the `compare` command.

use serde_json::json;

use super::command::CompareArgs;
use super::diagnostic::Failure;
use super::output;
use crate::adapter::outbound::store::read_document;
use crate::application::guard::{self, Fingerprint, GuardVerdict};
use crate::error::exit;

/// Execute the compare command.
///
/// Exits 1 when a side went from open lots to none.
pub fn execute(args: &CompareArgs) -> Result<u8, Failure> {
    let before = read_document(&args.before).map_err(|err| Failure::at(&args.before, err))?;
    let after = read_document(&args.after).map_err(|err| Failure::at(&args.after, err))?;

    let before_fp = Fingerprint::of(&before);
    let after_fp = Fingerprint::of(&after);
    let verdict = guard::check(before_fp, after_fp);

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Before", format!("{} ({})", args.before.display(), before.version()));
    output::field("After", format!("{} ({})", args.after.display(), after.version()));
    output::field("Lots", format!("{before_fp} → {after_fp}"));

    let wiped: Vec<String> = match &verdict {
        GuardVerdict::Safe => {
            output::success("No side lost all of its lots");
            Vec::new()
        }
        GuardVerdict::Unsafe { wiped } => {
            let sides: Vec<String> = wiped.iter().map(ToString::to_string).collect();
            output::error(&format!("{} side lost every lot", sides.join(" and ")));
            sides
        }
    };

    output::summary(json!({
        "command": "compare",
        "before": before_fp,
        "after": after_fp,
        "safe": verdict.is_safe(),
        "wiped": wiped,
    }));

    Ok(if verdict.is_safe() {
        exit::SUCCESS
    } else {
        exit::FAILURE
    })
}
