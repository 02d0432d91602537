//! Splitting a concatenated MJPEG stream into discrete frames.

/// JPEG start-of-image marker.
const SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker.
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Split a concatenated JPEG stream into individual frame blobs by
/// scanning for start/end-of-image markers.
///
/// Yields an empty vec (not an error) when the stream contains no
/// complete frame; a trailing frame with no end marker is dropped.
pub fn split_jpeg_stream(stream: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    let mut cursor = 0;

    while let Some(start) = find(stream, &SOI, cursor) {
        let Some(end) = find(stream, &EOI, start) else {
            break;
        };
        frames.push(stream[start..end + 2].to_vec());
        cursor = end + 2;
    }

    frames
}

fn find(haystack: &[u8], needle: &[u8; 2], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| from + i)
}
