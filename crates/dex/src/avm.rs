//! A minimal register/PC/stack interpreter for a tiny subset of Dalvik
//! opcodes, decoded from a method's raw `insns` stream. This is a teaching
//! interpreter, not a conformant Dalvik VM: only `add-int` and `return` are
//! understood, everything else is reported and skipped.

/// Symbolic operand fed to every decoded `add-int`; there is no real operand
/// stack wiring in this toy machine, just these two fixed constants.
const V_INPUT: i64 = 1;
const V_INPUT2: i64 = 2;

/// Execution state for a single method's instruction stream.
///
/// `registers` is sized 256 rather than the usual 16 Dalvik registers:
/// register indices here are taken straight from a byte (`vB`/`vC` are
/// `w & 0xFF`), so any of the 256 values a byte can hold must address a
/// distinct slot.
#[derive(Debug)]
pub struct Avm {
    registers: [i64; 256],
    pc: usize,
    stack: Vec<i64>,
}

impl Avm {
    pub fn new() -> Self {
        Avm {
            registers: [0; 256],
            pc: 0,
            stack: Vec::new(),
        }
    }

    /// Run `insns` to completion, printing the final returned register (if
    /// any `return` opcode is reached) and every "not supported" opcode
    /// encountered along the way. Returns the printed value, for callers
    /// that want it without scraping stdout.
    pub fn run(&mut self, insns: &[u16]) -> Option<i64> {
        self.pc = 0;
        let mut return_reg: Option<usize> = None;

        while self.pc < insns.len() {
            let opcode = (insns[self.pc] & 0xFF) as u8;
            self.pc += 1;

            match opcode {
                // add-int: vA = vInput + vInput2, where vA/vB/vC are decoded
                // from two whole code units rather than the usual packed
                // register triple. `pc` is only advanced past `w`; the code
                // unit `vC` is read from is left for the next dispatch
                // iteration to decode on its own.
                0x90 => {
                    let Some(&w) = insns.get(self.pc) else {
                        break;
                    };
                    let v_a = ((w >> 8) & 0x0F) as usize;
                    let v_b = (w & 0xFF) as usize;
                    self.registers[v_b] = V_INPUT;
                    self.pc += 1;

                    let Some(&next) = insns.get(self.pc) else {
                        break;
                    };
                    let v_c = (next & 0xFF) as usize;
                    self.registers[v_c] = V_INPUT2;

                    self.registers[v_a] = self.registers[v_b] + self.registers[v_c];
                    return_reg = Some(v_a);
                }
                // return
                0x0F => {
                    if let Some(reg) = return_reg {
                        println!("{}", self.registers[reg]);
                        return Some(self.registers[reg]);
                    }
                }
                _ => println!("not supported"),
            }
        }

        None
    }
}

impl Default for Avm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_int_then_return_prints_sum() {
        // matches the S5/S6 scenario: vA=2, vB=16 (0x10), vC=3
        let insns = [0x0090u16, 0x0210, 0x0003, 0x000F];
        let mut avm = Avm::new();
        assert_eq!(avm.run(&insns), Some(3));
    }

    #[test]
    fn unsupported_opcode_does_not_panic() {
        let insns = [0x0001u16];
        let mut avm = Avm::new();
        assert_eq!(avm.run(&insns), None);
    }

    #[test]
    fn return_with_no_prior_add_is_a_no_op() {
        let insns = [0x000Fu16];
        let mut avm = Avm::new();
        assert_eq!(avm.run(&insns), None);
    }
}
