//! Frequency analysis and tree-based code-length assignment

use crate::bits::CodeLengthTable;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Occurrence count for every byte value
pub type Frequencies = [u64; 256];

/// Count byte-value frequencies in `data`
pub fn count_frequencies(data: &[u8]) -> Frequencies {
    let mut freqs = [0u64; 256];
    accumulate_frequencies(&mut freqs, data);
    freqs
}

/// Add the byte-value counts of `data` to `freqs`
pub fn accumulate_frequencies(freqs: &mut Frequencies, data: &[u8]) {
    for &byte in data {
        freqs[byte as usize] += 1;
    }
}

enum Node {
    Leaf(u8),
    Internal { left: usize, right: usize },
}

/// Assign each present symbol a code length equal to its Huffman tree depth
///
/// Nodes live in an arena; a node's arena index doubles as its insertion
/// order, so equal weights pop in insertion order. Leaves are inserted in
/// ascending symbol order.
///
/// Degenerate alphabets: no symbols yields an empty table, a single symbol
/// gets a 1-bit code.
pub fn code_lengths(freqs: &Frequencies) -> CodeLengthTable {
    let mut table = CodeLengthTable::empty();
    let mut nodes: Vec<Node> = Vec::with_capacity(511);
    let mut heap = BinaryHeap::new();

    for (symbol, &weight) in freqs.iter().enumerate() {
        if weight > 0 {
            heap.push(Reverse((weight, nodes.len())));
            nodes.push(Node::Leaf(symbol as u8));
        }
    }

    match nodes.as_slice() {
        [] => return table,
        [Node::Leaf(symbol)] => {
            table.set(*symbol, 1);
            return table;
        }
        _ => {}
    }

    while let (Some(Reverse((w1, left))), Some(Reverse((w2, right)))) = (heap.pop(), heap.pop())
    {
        heap.push(Reverse((w1 + w2, nodes.len())));
        nodes.push(Node::Internal { left, right });
    }

    // The loop exits after popping the root alone; it is the last node built.
    let root = nodes.len() - 1;
    let mut stack = vec![(root, 0u8)];
    while let Some((index, depth)) = stack.pop() {
        match nodes[index] {
            Node::Leaf(symbol) => table.set(symbol, depth),
            Node::Internal { left, right } => {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
    }

    table
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_count_frequencies() {
        let freqs = count_frequencies(b"AAAABBBCC");
        assert_eq!(freqs[b'A' as usize], 4);
        assert_eq!(freqs[b'B' as usize], 3);
        assert_eq!(freqs[b'C' as usize], 2);
        assert_eq!(freqs.iter().sum::<u64>(), 9);
    }

    #[test]
    fn test_accumulate_across_inputs() {
        let mut freqs = count_frequencies(b"ab");
        accumulate_frequencies(&mut freqs, b"bc");
        assert_eq!(freqs[b'a' as usize], 1);
        assert_eq!(freqs[b'b' as usize], 2);
        assert_eq!(freqs[b'c' as usize], 1);
    }

    #[test]
    fn test_empty_alphabet() {
        let table = code_lengths(&[0; 256]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_single_symbol_gets_one_bit() {
        let table = code_lengths(&count_frequencies(b"zzzzzz"));
        assert_eq!(table.get(b'z'), 1);
        assert_eq!(table.symbol_count(), 1);
    }

    #[test]
    fn test_two_symbols() {
        let table = code_lengths(&count_frequencies(b"ab"));
        assert_eq!(table.get(b'a'), 1);
        assert_eq!(table.get(b'b'), 1);
    }

    #[test]
    fn test_skewed_weights_get_shorter_codes() {
        let table = code_lengths(&count_frequencies(b"AAAABBBCC"));
        assert!(table.get(b'A') < table.get(b'C'));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_full_alphabet_uniform() {
        let data: Vec<u8> = (0..=255u8).collect();
        let table = code_lengths(&count_frequencies(&data));
        assert_eq!(table.symbol_count(), 256);
        assert!(table.present().all(|(_, l)| l == 8));
    }

    #[test]
    fn test_kraft_equality_for_complete_tree() {
        let table = code_lengths(&count_frequencies(b"abracadabra alakazam"));
        let kraft: f64 = table
            .present()
            .map(|(_, l)| 2f64.powi(-i32::from(l)))
            .sum();
        assert!((kraft - 1.0).abs() < 1e-12);
    }
}
