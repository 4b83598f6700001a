use std::collections::HashMap;

use kiln_ir::Format;

const TRANSPOSABLE: [Format; 4] = [Format::Nchw, Format::Nhwc, Format::Hwcn, Format::Chwn];

/// Axis permutations between the 4-D plain formats.
///
/// `perm[i]` is the source position of the destination's `i`-th axis letter.
#[derive(Debug, Clone)]
pub struct TransposeTable {
    perms: HashMap<(Format, Format), [usize; 4]>,
}

impl TransposeTable {
    pub fn new() -> Self {
        let mut perms = HashMap::new();
        for src in TRANSPOSABLE {
            for dst in TRANSPOSABLE {
                if src == dst {
                    continue;
                }
                if let Some(perm) = letter_permutation(src, dst) {
                    perms.insert((src, dst), perm);
                }
            }
        }
        Self { perms }
    }

    pub fn perm(&self, src: Format, dst: Format) -> Option<&[usize]> {
        self.perms.get(&(src, dst)).map(|perm| perm.as_slice())
    }
}

impl Default for TransposeTable {
    fn default() -> Self {
        Self::new()
    }
}

fn letter_permutation(src: Format, dst: Format) -> Option<[usize; 4]> {
    let letters = dst.axes()?;
    let mut perm = [0; 4];
    for (slot, letter) in perm.iter_mut().zip(letters.chars()) {
        *slot = src.axis_index(letter)?;
    }
    Some(perm)
}
