//! Splits the compiler's byte stream into length-prefixed packet payloads,
//! and frames payloads for writing.
//!
//! A packet is a four-byte little-endian unsigned length followed by that
//! many payload bytes. The framer makes no assumption about how the stream
//! is chunked: headers and payloads may straddle any number of reads.

/// Incremental decoder of length-prefixed packets.
#[derive(Debug, Default)]
pub(crate) struct PacketFramer {
    header: [u8; 4],
    header_filled: usize,
    payload: Vec<u8>,
    payload_len: usize,
}

impl PacketFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume `chunk`, returning each completed payload in order.
    ///
    /// A zero-length payload is emitted as soon as its header completes.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();

        loop {
            if self.header_filled < 4 {
                if chunk.is_empty() {
                    break;
                }
                let take = (4 - self.header_filled).min(chunk.len());
                self.header[self.header_filled..self.header_filled + take]
                    .copy_from_slice(&chunk[..take]);
                self.header_filled += take;
                chunk = &chunk[take..];

                if self.header_filled < 4 {
                    break;
                }
                self.payload_len = u32::from_le_bytes(self.header) as usize;
            }

            let take = (self.payload_len - self.payload.len()).min(chunk.len());
            self.payload.extend_from_slice(&chunk[..take]);
            chunk = &chunk[take..];

            if self.payload.len() < self.payload_len {
                break;
            }
            out.push(std::mem::take(&mut self.payload));
            self.header_filled = 0;
            self.payload_len = 0;
        }

        out
    }

    /// True if the framer holds a partially-received packet. On EOF this
    /// means the compiler hung up mid-frame.
    pub fn mid_frame(&self) -> bool {
        self.header_filled != 0 || !self.payload.is_empty()
    }
}

/// Frame `payload` for writing: one allocation of `4 + len` and one copy.
pub(crate) fn frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod test {
    use super::{frame, PacketFramer};
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_single_packet_across_chunks() {
        // A 300-byte payload of ones, with the header fed byte by byte and
        // the payload split unevenly.
        let mut framer = PacketFramer::new();
        let payload = vec![1u8; 300];
        let framed = frame(&payload);
        assert_eq!(&framed[..4], &[44, 1, 0, 0]);

        assert!(framer.feed(&framed[0..1]).is_empty());
        assert!(framer.feed(&framed[1..3]).is_empty());
        assert!(framer.feed(&framed[3..4]).is_empty());
        assert!(framer.mid_frame());
        assert!(framer.feed(&framed[4..104]).is_empty());
        let out = framer.feed(&framed[104..]);
        assert_eq!(out, vec![payload]);
        assert!(!framer.mid_frame());
    }

    #[test]
    fn test_empty_payload_emitted_on_header_completion() {
        let mut framer = PacketFramer::new();
        assert!(framer.feed(&[0, 0, 0]).is_empty());
        assert_eq!(framer.feed(&[0]), vec![Vec::<u8>::new()]);
        assert!(!framer.mid_frame());
    }

    #[test]
    fn test_chunk_straddling_packet_boundary() {
        // One read carrying the tail of packet A, all of packet B, and the
        // head of packet C.
        let mut framer = PacketFramer::new();
        let mut stream = frame(b"aaaa");
        stream.extend_from_slice(&frame(b""));
        stream.extend_from_slice(&frame(b"cc"));

        assert!(framer.feed(&stream[..6]).is_empty());
        let out = framer.feed(&stream[6..stream.len() - 1]);
        assert_eq!(out, vec![b"aaaa".to_vec(), Vec::new()]);
        assert!(framer.mid_frame());
        assert_eq!(framer.feed(&stream[stream.len() - 1..]), vec![b"cc".to_vec()]);
    }

    // For any payload sequence and any chunking of the framed stream, the
    // framer emits exactly the original payloads.
    #[quickcheck]
    fn test_feed_is_chunking_invariant(payloads: Vec<Vec<u8>>, splits: Vec<usize>) -> bool {
        let mut stream = Vec::new();
        for payload in &payloads {
            stream.extend_from_slice(&frame(payload));
        }

        let mut framer = PacketFramer::new();
        let mut out = Vec::new();
        let mut rest = stream.as_slice();
        for split in splits {
            if rest.is_empty() {
                break;
            }
            let take = split % (rest.len() + 1);
            out.extend(framer.feed(&rest[..take]));
            rest = &rest[take..];
        }
        out.extend(framer.feed(rest));

        out == payloads
    }

    #[quickcheck]
    fn test_frame_feed_round_trip(payload: Vec<u8>) -> bool {
        let mut framer = PacketFramer::new();
        framer.feed(&frame(&payload)) == vec![payload]
    }
}
