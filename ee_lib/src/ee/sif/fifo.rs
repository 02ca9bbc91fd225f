use serde_big_array::BigArray;

/// Capacity of a SIF FIFO, in 32bit words
pub const FIFO_SIZE: usize = 128;

/// Circular word buffer sitting between the EE and IOP halves of a SIF channel
#[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct Fifo {
    #[serde(with = "BigArray")]
    data: [u32; FIFO_SIZE],
    /// Read index in `data`
    read_pos: usize,
    /// Write index in `data`
    write_pos: usize,
    /// Number of words currently held
    size: usize,
}

impl Fifo {
    pub fn new() -> Fifo {
        Fifo {
            data: [0; FIFO_SIZE],
            read_pos: 0,
            write_pos: 0,
            size: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of words that can be written
    pub fn free(&self) -> usize {
        FIFO_SIZE - self.size
    }

    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.size = 0;
    }

    /// Append `words`. The caller must make sure there's enough room.
    pub fn write(&mut self, words: &[u32]) {
        let count = words.len();

        debug_assert!(count <= self.free(), "SIF FIFO overflow");

        // Up to the end of the buffer, then wrap around to the start
        let first = count.min(FIFO_SIZE - self.write_pos);
        let (head, tail) = words.split_at(first);

        self.data[self.write_pos..self.write_pos + first].copy_from_slice(head);
        self.data[..tail.len()].copy_from_slice(tail);

        self.write_pos = (self.write_pos + count) % FIFO_SIZE;
        self.size += count;
    }

    /// Fill `words` from the front of the FIFO. The caller must make sure enough words are
    /// available.
    pub fn read(&mut self, words: &mut [u32]) {
        let count = words.len();

        debug_assert!(count <= self.size, "SIF FIFO underflow");

        let first = count.min(FIFO_SIZE - self.read_pos);
        let (head, tail) = words.split_at_mut(first);

        head.copy_from_slice(&self.data[self.read_pos..self.read_pos + first]);
        let rest = tail.len();
        tail.copy_from_slice(&self.data[..rest]);

        self.read_pos = (self.read_pos + count) % FIFO_SIZE;
        self.size -= count;
    }
}

impl Default for Fifo {
    fn default() -> Fifo {
        Fifo::new()
    }
}

impl std::fmt::Debug for Fifo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Fifo")
            .field("read_pos", &self.read_pos)
            .field("write_pos", &self.write_pos)
            .field("size", &self.size)
            .finish()
    }
}

#[test]
fn test_fifo_round_trip() {
    let mut fifo = Fifo::new();

    assert!(fifo.is_empty());
    assert_eq!(fifo.free(), FIFO_SIZE);

    let words: Vec<u32> = (0..FIFO_SIZE as u32).collect();

    fifo.write(&words);
    assert_eq!(fifo.len(), FIFO_SIZE);
    assert_eq!(fifo.free(), 0);

    let mut out = vec![0; FIFO_SIZE];
    fifo.read(&mut out);
    assert_eq!(out, words);
    assert!(fifo.is_empty());
}

#[test]
fn test_fifo_wraparound() {
    let mut fifo = Fifo::new();
    let mut scratch = vec![0; 100];

    // Move both cursors close to the end of the buffer
    fifo.write(&[0; 100]);
    fifo.read(&mut scratch);
    assert!(fifo.is_empty());

    // 60 words: 28 at the end of the buffer, 32 at the start
    let words: Vec<u32> = (0..60).map(|i| 0x1000 + i).collect();
    fifo.write(&words);
    assert_eq!(fifo.len(), 60);

    // Read across the boundary in uneven pieces
    let mut a = vec![0; 27];
    let mut b = vec![0; 33];
    fifo.read(&mut a);
    fifo.read(&mut b);

    assert_eq!(a, words[..27]);
    assert_eq!(b, words[27..]);
    assert!(fifo.is_empty());

    // Interleaved writes and reads keep the order
    for round in 0..10u32 {
        let chunk: Vec<u32> = (0..37).map(|i| round * 100 + i).collect();
        let mut out = vec![0; 37];

        fifo.write(&chunk);
        fifo.read(&mut out);
        assert_eq!(out, chunk);
    }
}

#[test]
fn test_fifo_clear() {
    let mut fifo = Fifo::new();

    fifo.write(&[1, 2, 3]);
    fifo.clear();
    assert!(fifo.is_empty());

    fifo.write(&[4]);
    let mut out = [0];
    fifo.read(&mut out);
    assert_eq!(out, [4]);
}
