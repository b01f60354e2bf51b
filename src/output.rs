use colored::{ColoredString, Colorize};

use crate::disasm::Record;
use crate::opcode::Pair;
use crate::state::State;

/// Status line: coloured verb right-aligned in a 12 column gutter, then detail.
pub fn message(color: MsgColor, left: &str, right: &str) {
    println!("{:>12} {right}", color.paint(left));
}

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

impl MsgColor {
    fn paint(self, text: &str) -> ColoredString {
        match self {
            MsgColor::Green => text.green().bold(),
            MsgColor::Cyan => text.cyan().bold(),
            MsgColor::Red => text.red().bold(),
        }
    }
}

/// Dump the register file.
///
/// `minimal` produces one `NAME 0xVALUE` line per register, suited for blackbox tests.
pub fn print_registers(state: &State, minimal: bool) {
    print!("{}", format_registers(state, minimal));
}

fn format_registers(state: &State, minimal: bool) -> String {
    let bytes = [
        ("A", state.a),
        ("B", state.b),
        ("C", state.c),
        ("D", state.d),
        ("E", state.e),
        ("H", state.h),
        ("L", state.l),
    ];
    let words = [("PC", state.pc), ("SP", state.sp)];
    let cc = &state.cc;
    let flags = [
        ("S", cc.s),
        ("Z", cc.z),
        ("AC", cc.ac),
        ("P", cc.p),
        ("CY", cc.cy),
    ];

    let mut out = String::new();
    if minimal {
        for (name, value) in bytes {
            out.push_str(&format!("{name} {value:#04x}\n"));
        }
        for (name, value) in words {
            out.push_str(&format!("{name} {value:#06x}\n"));
        }
        let flags: Vec<_> = flags
            .iter()
            .map(|(name, set)| format!("{name}={}", *set as u8))
            .collect();
        out.push_str(&format!("FLAGS {}\n", flags.join(" ")));
        out.push_str(&format!("IE {}\n", state.int_enable as u8));
        return out;
    }

    out.push_str("\x1b[2m┌──────────────────────────────────┐\x1b[0m\n");
    out.push_str("\x1b[2m│      \x1b[3mhex   uint   int   char\x1b[0m\x1b[2m     │\x1b[0m\n");
    for (name, value) in bytes {
        out.push_str(&format!(
            "\x1b[2m│\x1b[0m \x1b[1m{name}\x1b[0m   0x{value:02x}  {value:>4}  {:>4}   {}   \x1b[2m│\x1b[0m\n",
            value as i8,
            char_display(value),
        ));
    }
    out.push_str(&format!(
        "\x1b[2m│\x1b[0m \x1b[1mBC\x1b[0m {:04x} \x1b[1mDE\x1b[0m {:04x} \x1b[1mHL\x1b[0m {:04x}      \x1b[2m│\x1b[0m\n",
        state.pair(Pair::Bc),
        state.pair(Pair::De),
        state.pair(Pair::Hl),
    ));
    out.push_str(&format!(
        "\x1b[2m│\x1b[0m \x1b[1mPC\x1b[0m {:04x} \x1b[1mSP\x1b[0m {:04x} \x1b[1mIE\x1b[0m {}         \x1b[2m│\x1b[0m\n",
        state.pc, state.sp, state.int_enable as u8,
    ));
    let flags: String = flags
        .iter()
        .map(|(name, set)| {
            if *set {
                format!("\x1b[1m{name}\x1b[0m ")
            } else {
                format!("\x1b[2m{}\x1b[0m ", name.to_lowercase())
            }
        })
        .collect();
    out.push_str(&format!("\x1b[2m│\x1b[0m {flags}{:21}\x1b[2m│\x1b[0m\n", ""));
    out.push_str("\x1b[2m└──────────────────────────────────┘\x1b[0m\n");
    out
}

/// Three columns wide.
fn char_display(value: u8) -> String {
    match value {
        // ASCII control characters which are arbitrarily considered significant
        0x00 => "NUL".to_string(),
        0x08 => "BS ".to_string(),
        0x09 => "HT ".to_string(),
        0x0a => "LF ".to_string(),
        0x0d => "CR ".to_string(),
        0x1b => "ESC".to_string(),
        0x7f => "DEL".to_string(),
        0x20 => "[_]".to_string(),
        0x21..=0x7e => format!("{:<3}", value as char),
        0x00..=0x7f => "\x1b[2m───\x1b[0m".to_string(),
        0x80.. => "\x1b[2m┄┄┄\x1b[0m".to_string(),
    }
}

/// Print a listing, one record per line, with the effect of each instruction.
pub fn print_listing<'a>(records: impl IntoIterator<Item = Record<'a>>) {
    for record in records {
        let line = format_listing_line(&record);
        if record.is_truncated() {
            println!("{}", line.red());
        } else {
            println!("{line}");
        }
    }
}

fn format_listing_line(record: &Record) -> String {
    format!("{:<30}; {}", record.to_string(), record.opcode.summary)
}
