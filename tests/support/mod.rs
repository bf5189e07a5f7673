#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Legacy document with two BUY lots, one SELL lot, one `LONG` lot, one null
/// entry, a model blob, and an unknown top-level key.
pub const LEGACY_STATE: &str = r#"{
 "EquityUSD": 1000,
 "DailyStart": "2024-03-01T00:00:00Z",
 "DailyPnL": -12.5,
 "Lots": [
  {"OpenPrice": 100, "Side": "BUY", "SizeBase": 0.5, "Stop": 95, "Take": 110, "OpenTime": "2024-03-01T10:00:00Z", "EntryFee": 0.1, "TrailActive": false, "TrailPeak": 0, "TrailStop": 0},
  {"OpenPrice": 101, "Side": "sell", "SizeBase": 0.25, "TrailPeak": 42},
  null,
  {"OpenPrice": 102, "Side": "LONG", "SizeBase": 1},
  {"OpenPrice": 103, "Side": "Buy", "SizeBase": 2, "Broker": "x"}
 ],
 "Model": {"weights": [0.1, 0.2, 0.30000000000000004], "bias": 1e-7},
 "MdlExt": {"ext": "blob"},
 "WalkForwardMin": 240,
 "LastFit": "2024-02-29T23:00:00Z",
 "LastAddEquityBuy": 500,
 "Exits": []
}"#;

/// Current document with `buy` BUY lots and `sell` SELL lots.
pub fn current_state(equity: f64, buy: usize, sell: usize) -> String {
    let lots = |side: &str, n: usize| -> String {
        (0..n)
            .map(|i| format!(r#"{{"OpenPrice": {}, "Side": "{side}", "SizeBase": 1}}"#, 100 + i))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let runner = |n: usize| if n > 0 { 0 } else { -1 };
    format!(
        r#"{{
 "EquityUSD": {equity},
 "DailyStart": "2024-03-01T00:00:00Z",
 "DailyPnL": 0,
 "Model": {{"weights": [1, 2, 3]}},
 "MdlExt": null,
 "WalkForwardMin": 60,
 "LastFit": "2024-02-29T23:00:00Z",
 "BookBuy": {{"runner_id": {}, "lots": [{}]}},
 "BookSell": {{"runner_id": {}, "lots": [{}]}},
 "LastAddBuy": "0001-01-01T00:00:00Z",
 "LastAddSell": "0001-01-01T00:00:00Z",
 "WinLowBuy": 0,
 "WinHighSell": 0,
 "LatchedGateBuy": 0,
 "LatchedGateSell": 0,
 "LastAddEquityBuy": 200
}}"#,
        runner(buy),
        lots("BUY", buy),
        runner(sell),
        lots("SELL", sell),
    )
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

/// Config with one account `testbot` whose state file is `state_file` and
/// whose supervisor is `program`.
pub fn write_config(dir: &Path, program: &str, state_file: &Path) -> PathBuf {
    let content = format!(
        r#"
[controller]
program = "{program}"

[watch]
interval_ms = 10
tolerance = 1
timeout_secs = 5

[accounts.testbot]
service = "bot-testbot"
state_file = "{}"
"#,
        state_file.display()
    );
    write_file(dir, "config.toml", &content)
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let bytes = fs::read(path).expect("read json");
    serde_json::from_slice(&bytes).expect("parse json")
}

/// Files in `dir` other than `keep`.
pub fn other_files(dir: &Path, keep: &[&str]) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .filter(|name| !keep.contains(&name.as_str()))
        .collect();
    names.sort();
    names
}
