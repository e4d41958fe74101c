//! Typed trace events.
//!
//! One `TraceEvent` is produced per input line. Events are immutable once
//! parsed and keep the original line text for verbatim passthrough.

use std::fmt;

/// A raw data word as printed in the trace
///
/// The digit count is kept so annotations echo the trace's own width
/// (`00000072` rather than `72`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexWord {
    pub value: u64,
    pub digits: usize,
}

impl HexWord {
    pub fn new(value: u64, digits: usize) -> Self {
        Self { value, digits }
    }

    /// Encoding size in bytes (two hex digits per byte)
    pub fn byte_len(&self) -> u64 {
        self.digits.div_ceil(2) as u64
    }
}

impl fmt::Display for HexWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.value, width = self.digits)
    }
}

/// How an instruction fetch was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// `IT`: instruction executed
    Executed,
    /// `IS`: condition failed, instruction skipped
    Skipped,
    /// `E NOT_IN_THUMB_STATE`: reduced-information trace, no disassembly
    NotInThumbState,
}

/// Address space of a memory access, from the tag suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSpace {
    /// `_D`
    Data,
    /// `_I`
    Instruction,
    /// Any other or missing suffix
    Other,
}

/// `IT`/`IS`/`E NOT_IN_THUMB_STATE` lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionFetch {
    pub address: u64,
    pub encoding: HexWord,
    pub disassembly: Option<String>,
    pub state: FetchState,
}

impl InstructionFetch {
    /// Upper-cased mnemonic, if the line carries disassembly
    pub fn mnemonic(&self) -> Option<String> {
        self.disassembly
            .as_deref()
            .and_then(|d| d.split_ascii_whitespace().next())
            .map(|m| m.to_ascii_uppercase())
    }

    /// Operand text up to any trailing `;` comment, lower-cased
    pub fn operands(&self) -> String {
        let Some(disassembly) = self.disassembly.as_deref() else {
            return String::new();
        };
        let code = disassembly.split(';').next().unwrap_or("");
        let mut words = code.split_ascii_whitespace();
        words.next();
        words.collect::<Vec<_>>().join(" ").to_ascii_lowercase()
    }

    /// Whether this instruction opens a stack frame
    ///
    /// A register push, or `SUB sp,sp,#n` reserving locals.
    pub fn is_prologue(&self) -> bool {
        if self.is_push() {
            return true;
        }
        match self.mnemonic().as_deref() {
            Some("SUB" | "SUB.W" | "SUBS") => {}
            Some(_) => return false,
            // Thumb `SUB sp,sp,#imm` is `b080`..`b0ff`
            None => return self.encoding.digits == 4 && self.encoding.value & 0xff80 == 0xb080,
        }
        let operands = self.operands();
        operands.starts_with("sp,sp") || operands.starts_with("sp, sp")
    }

    /// Whether this instruction pushes registers onto the stack
    ///
    /// Uses the disassembly when present, otherwise the Thumb encoding
    /// (`PUSH` is `b4xx`/`b5xx`, `PUSH.W`/`STMDB sp!` is `e92d xxxx`).
    pub fn is_push(&self) -> bool {
        match self.mnemonic() {
            Some(mnemonic) => match mnemonic.as_str() {
                "PUSH" | "PUSH.W" => true,
                "STMDB" | "STMDB.W" | "STMFD" => self.operands().starts_with("sp!"),
                _ => false,
            },
            None => {
                let enc = self.encoding.value;
                match self.encoding.digits {
                    4 => enc & 0xfe00 == 0xb400,
                    8 => enc >> 16 == 0xe92d,
                    _ => false,
                }
            }
        }
    }

    /// Whether this instruction returns to the caller
    ///
    /// `BX lr` (`4770`) or a `POP` that loads the pc (`bdxx`).
    pub fn is_return(&self) -> bool {
        match self.mnemonic() {
            Some(mnemonic) => {
                let operands = self.operands();
                match mnemonic.as_str() {
                    "BX" => operands == "lr",
                    "POP" | "POP.W" => operands.contains("pc"),
                    "LDMIA" | "LDMIA.W" | "LDMFD" => {
                        operands.starts_with("sp!") && operands.contains("pc")
                    }
                    _ => false,
                }
            }
            None => {
                let enc = self.encoding.value;
                match self.encoding.digits {
                    4 => enc == 0x4770 || enc & 0xff00 == 0xbd00,
                    _ => false,
                }
            }
        }
    }
}

/// `MR*`/`MW*` lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAccess {
    pub tag: String,
    pub width: Option<u8>,
    pub space: AccessSpace,
    pub address: u64,
    pub value: HexWord,
}

/// `R <register> <value> [(<alias>)]` lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterWrite {
    pub register: String,
    pub value: HexWord,
    pub alias: Option<String>,
}

impl RegisterWrite {
    /// Register name for lookups (lower case)
    pub fn key(&self) -> String {
        self.register.to_ascii_lowercase()
    }
}

/// Closed set of event kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    InstructionFetch(InstructionFetch),
    MemoryRead(MemoryAccess),
    MemoryWrite(MemoryAccess),
    RegisterWrite(RegisterWrite),
    /// Blank lines, comments, unknown tags and unparseable lines
    Opaque,
}

impl EventKind {
    /// Short name used in counters and logs
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::InstructionFetch(_) => "instruction_fetch",
            EventKind::MemoryRead(_) => "memory_read",
            EventKind::MemoryWrite(_) => "memory_write",
            EventKind::RegisterWrite(_) => "register_write",
            EventKind::Opaque => "opaque",
        }
    }
}

/// One parsed trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// 1-based line number in the input
    pub line_number: usize,

    /// Simulation time; `None` for opaque lines without a timestamp
    pub timestamp: Option<u64>,

    pub kind: EventKind,

    /// Original line text, without its terminator
    pub text: String,
}

impl TraceEvent {
    /// Event that carries no state meaning but is still written verbatim
    pub fn opaque(line_number: usize, text: impl Into<String>) -> Self {
        Self {
            line_number,
            timestamp: None,
            kind: EventKind::Opaque,
            text: text.into(),
        }
    }

    pub fn as_fetch(&self) -> Option<&InstructionFetch> {
        match &self.kind {
            EventKind::InstructionFetch(fetch) => Some(fetch),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch(encoding: u64, digits: usize, disassembly: Option<&str>) -> InstructionFetch {
        InstructionFetch {
            address: 0x2000afc0,
            encoding: HexWord::new(encoding, digits),
            disassembly: disassembly.map(str::to_string),
            state: FetchState::Executed,
        }
    }

    #[test]
    fn test_hex_word_keeps_width() {
        assert_eq!(HexWord::new(0x72, 8).to_string(), "00000072");
        assert_eq!(HexWord::new(0xb510, 4).to_string(), "b510");
        assert_eq!(HexWord::new(0xb510, 4).byte_len(), 2);
    }

    #[test]
    fn test_prologue_from_disassembly() {
        assert!(fetch(0xb510, 4, Some("PUSH     {r4,lr}")).is_prologue());
        assert!(fetch(0xe92d41f0, 8, Some("STMDB    sp!,{r4-r8,lr}")).is_prologue());
        assert!(fetch(0xb082, 4, Some("SUB      sp,sp,#8")).is_prologue());
        assert!(!fetch(0x488e, 4, Some("LDR      r0,[pc,#568]  ; [0x100002b0]")).is_prologue());
    }

    #[test]
    fn test_prologue_from_encoding() {
        assert!(fetch(0xb570, 4, None).is_prologue());
        assert!(fetch(0xe92d4ff0, 8, None).is_prologue());
        assert!(!fetch(0xbd10, 4, None).is_prologue());
    }

    #[test]
    fn test_stack_reservation_from_encoding() {
        let sub = fetch(0xb082, 4, None);
        assert!(sub.is_prologue());
        assert!(!sub.is_push());
        // ADD sp,sp,#imm shares the b0 prefix
        assert!(!fetch(0xb002, 4, None).is_prologue());
    }

    #[test]
    fn test_stack_reservation_is_prologue_but_not_push() {
        let sub = fetch(0xb082, 4, Some("SUB      sp,sp,#8"));
        assert!(sub.is_prologue());
        assert!(!sub.is_push());
        assert!(fetch(0xb510, 4, Some("PUSH     {r4,lr}")).is_push());
    }

    #[test]
    fn test_return_detection() {
        assert!(fetch(0xbd10, 4, Some("POP      {r4,pc}")).is_return());
        assert!(fetch(0x4770, 4, Some("BX       lr")).is_return());
        assert!(!fetch(0x4718, 4, Some("BX       r3")).is_return());
        assert!(fetch(0xbd70, 4, None).is_return());
        assert!(!fetch(0xb510, 4, None).is_return());
    }
}
