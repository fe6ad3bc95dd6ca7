//! LZW decoder for `compress(1)` ".Z" containers.
//!
//! No crate in our stack covers this legacy scheme, so the classic
//! ncompress algorithm is reproduced here: LSB-first variable-width
//! codes (9 to the declared maximum), optional block mode with a
//! CLEAR code, and the historical bit-group padding on width changes.
use crate::error::Error;

const MAGIC: [u8; 2] = [0x1f, 0x9d];
const BIT_MASK: u8 = 0x1f;
const BLOCK_MODE: u8 = 0x80;
const CLEAR: u32 = 256;
const FIRST: u32 = 257;

pub(crate) fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    if data.len() < 3 || data[0..2] != MAGIC {
        return Err(Error::InvalidInput(".Z magic bytes not found".to_string()));
    }
    let max_bits = (data[2] & BIT_MASK) as u32;
    let block_mode = data[2] & BLOCK_MODE != 0;
    if !(9..=16).contains(&max_bits) {
        return Err(Error::InvalidInput(format!(
            ".Z header declares {} bit codes",
            max_bits
        )));
    }

    let input = &data[3..];
    let bits_total = input.len() * 8;
    let dict_size = 1usize << max_bits;

    let mut prefix = vec![0u16; dict_size];
    let mut suffix = vec![0u8; dict_size];
    let mut free_ent: u32 = if block_mode { FIRST } else { 256 };
    let mut n_bits: u32 = 9;
    let mut maxcode: u32 = (1 << n_bits) - 1;
    let mut oldcode: Option<u32> = None;
    let mut finchar: u8 = 0;
    let mut posbits: usize = 0;
    let mut out = Vec::with_capacity(data.len() * 3);
    let mut stack = Vec::with_capacity(dict_size);

    loop {
        if free_ent > maxcode {
            // the compressor pads its output to a code-group boundary
            // whenever the width grows
            posbits = round_up(posbits, n_bits);
            n_bits += 1;
            maxcode = if n_bits == max_bits {
                1 << n_bits
            } else {
                (1 << n_bits) - 1
            };
        }
        if posbits + n_bits as usize > bits_total {
            break;
        }
        let code = read_code(input, posbits, n_bits);
        posbits += n_bits as usize;

        let oc = match oldcode {
            None => {
                if code >= 256 {
                    return Err(Error::InvalidInput(
                        "corrupt .Z stream: first code out of range".to_string(),
                    ));
                }
                finchar = code as u8;
                out.push(finchar);
                oldcode = Some(code);
                continue;
            },
            Some(oc) => oc,
        };

        if code == CLEAR && block_mode {
            // same boundary padding applies after a dictionary reset
            posbits = round_up(posbits, n_bits);
            n_bits = 9;
            maxcode = (1 << n_bits) - 1;
            free_ent = FIRST;
            oldcode = None;
            continue;
        }

        let incode = code;
        stack.clear();
        let mut c = code;
        if c >= free_ent {
            if c > free_ent {
                return Err(Error::InvalidInput(
                    "corrupt .Z stream: code beyond dictionary".to_string(),
                ));
            }
            // KwKwK special case
            stack.push(finchar);
            c = oc;
        }
        while c >= 256 {
            stack.push(suffix[c as usize]);
            c = prefix[c as usize] as u32;
        }
        finchar = c as u8;
        stack.push(finchar);
        out.extend(stack.iter().rev());

        if (free_ent as usize) < dict_size {
            prefix[free_ent as usize] = oc as u16;
            suffix[free_ent as usize] = finchar;
            free_ent += 1;
        }
        oldcode = Some(incode);
    }
    Ok(out)
}

// next boundary of n_bits * 8 bits
fn round_up(posbits: usize, n_bits: u32) -> usize {
    let group = (n_bits as usize) << 3;
    match posbits % group {
        0 => posbits,
        rem => posbits + group - rem,
    }
}

fn read_code(input: &[u8], posbits: usize, n_bits: u32) -> u32 {
    let mut word: u32 = 0;
    let byte = posbits >> 3;
    for k in 0..3 {
        if byte + k < input.len() {
            word |= (input[byte + k] as u32) << (8 * k);
        }
    }
    (word >> (posbits & 7)) & ((1 << n_bits) - 1)
}
