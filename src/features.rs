use std::fmt;
use std::str::FromStr;

/// Instruction group an opcode belongs to.
///
/// Everything outside of [`Group::Base`] can be switched off to build a reduced
/// machine; opcodes of a disabled group fault when executed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Group {
    /// Always enabled.
    Base,
    /// `IN`, `OUT`
    Io,
    /// `EI`, `DI`
    Interrupt,
    /// `RST n`
    Restart,
    /// `DAA`
    Decimal,
    /// Duplicate encodings of `NOP`, `JMP`, `RET` and `CALL`.
    Undocumented,
}

/// Set of optional instruction groups the engine executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    io: bool,
    interrupt: bool,
    restart: bool,
    decimal: bool,
    undocumented: bool,
}

const NAMES: [(&str, Group); 5] = [
    ("io", Group::Io),
    ("interrupt", Group::Interrupt),
    ("restart", Group::Restart),
    ("decimal", Group::Decimal),
    ("undocumented", Group::Undocumented),
];

impl Features {
    /// Complete 8080.
    pub const fn all() -> Self {
        Features {
            io: true,
            interrupt: true,
            restart: true,
            decimal: true,
            undocumented: true,
        }
    }

    /// Only [`Group::Base`].
    pub const fn minimal() -> Self {
        Features {
            io: false,
            interrupt: false,
            restart: false,
            decimal: false,
            undocumented: false,
        }
    }

    pub fn enables(&self, group: Group) -> bool {
        match group {
            Group::Base => true,
            Group::Io => self.io,
            Group::Interrupt => self.interrupt,
            Group::Restart => self.restart,
            Group::Decimal => self.decimal,
            Group::Undocumented => self.undocumented,
        }
    }

    fn flag_mut(&mut self, group: Group) -> Option<&mut bool> {
        match group {
            Group::Base => None,
            Group::Io => Some(&mut self.io),
            Group::Interrupt => Some(&mut self.interrupt),
            Group::Restart => Some(&mut self.restart),
            Group::Decimal => Some(&mut self.decimal),
            Group::Undocumented => Some(&mut self.undocumented),
        }
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for Features {
    type Err = String;
    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string.trim() {
            "all" => return Ok(Self::all()),
            "minimal" => return Ok(Self::minimal()),
            _ => (),
        }
        let mut features = Self::minimal();
        for word in string.split(',').map(str::trim) {
            if word.is_empty() {
                continue;
            }
            let group = NAMES
                .iter()
                .find(|(name, _)| *name == word)
                .map(|(_, group)| *group)
                .ok_or_else(|| format!("Unknown feature '{}'", word))?;
            let Some(value) = features.flag_mut(group) else {
                continue;
            };
            if *value {
                return Err(format!("Cannot specify feature '{}' twice", word));
            }
            *value = true;
        }
        Ok(features)
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut has_any_feature = false;
        for (name, group) in NAMES {
            if !self.enables(group) {
                continue;
            }
            if has_any_feature {
                write!(f, ",")?;
            }
            write!(f, "{}", name)?;
            has_any_feature = true;
        }
        Ok(())
    }
}
