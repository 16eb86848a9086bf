//! Exact nearest-neighbor search over a flat vector table.
//!
//! The corpus target is thousands to low tens of thousands of chunks, so a
//! brute-force scan under L2 distance is both exact and fast enough; no
//! approximate structure is involved.

use super::IndexError;

/// One k-NN result: a position into the snapshot's parallel sequences and
/// the L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Flat (brute-force) L2 index. Rows are stored contiguously; row `i` is the
/// embedding of the chunk at position `i` of the owning snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index for vectors of the given dimension.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            data: Vec::new(),
        }
    }

    /// Builds an index from an ordered vector list in one pass.
    pub fn with_vectors(dim: usize, vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        let mut index = Self::new(dim);
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Appends one vector. Position equals the number of previously added
    /// vectors.
    pub fn add(&mut self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Exact k-nearest-neighbor search under L2 distance.
    ///
    /// Results come back ordered by ascending distance, ties broken by
    /// position. At most `min(k, len)` neighbors are returned.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut neighbors: Vec<Neighbor> = (0..self.len())
            .map(|position| {
                let row = self.row(position);
                let dist_sq: f32 = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| {
                        let d = a - b;
                        d * d
                    })
                    .sum();
                Neighbor {
                    position,
                    distance: dist_sq.sqrt(),
                }
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Serializes the index into its snapshot artifact form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_rows(INDEX_MAGIC, self.dim, &self.data)
    }

    /// Deserializes an index artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        let (dim, data) = decode_rows(INDEX_MAGIC, bytes)?;
        Ok(Self { dim, data })
    }
}

// ── Snapshot artifact codec ──────────────────────────────────────────
//
// Layout: 8-byte magic, u32 dimension, u64 row count, then row-major f32
// payload. Artifacts are local to one deployment, so floats are stored in
// native byte order.

pub(crate) const INDEX_MAGIC: &[u8; 8] = b"DRGIDX01";
pub(crate) const VECTORS_MAGIC: &[u8; 8] = b"DRGVEC01";

const HEADER_LEN: usize = 8 + 4 + 8;

pub(crate) fn encode_rows(magic: &[u8; 8], dim: usize, data: &[f32]) -> Vec<u8> {
    let count = if dim == 0 { 0 } else { data.len() / dim };
    let mut out = Vec::with_capacity(HEADER_LEN + data.len() * 4);
    out.extend_from_slice(magic);
    out.extend_from_slice(&(dim as u32).to_le_bytes());
    out.extend_from_slice(&(count as u64).to_le_bytes());
    out.extend_from_slice(bytemuck::cast_slice(data));
    out
}

pub(crate) fn decode_rows(magic: &[u8; 8], bytes: &[u8]) -> Result<(usize, Vec<f32>), IndexError> {
    if bytes.len() < HEADER_LEN {
        return Err(IndexError::Corrupt("artifact shorter than header".into()));
    }
    if &bytes[..8] != magic {
        return Err(IndexError::Corrupt("artifact magic mismatch".into()));
    }

    let dim = u32::from_le_bytes(bytes[8..12].try_into().expect("4 bytes")) as usize;
    let count = u64::from_le_bytes(bytes[12..20].try_into().expect("8 bytes")) as usize;

    let payload = &bytes[HEADER_LEN..];
    let expected = dim
        .checked_mul(count)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| IndexError::Corrupt("artifact header overflow".into()))?;
    if payload.len() != expected {
        return Err(IndexError::Corrupt(format!(
            "artifact payload is {} bytes, header implies {expected}",
            payload.len()
        )));
    }

    let mut data = Vec::with_capacity(dim * count);
    for chunk in payload.chunks_exact(4) {
        data.push(f32::from_ne_bytes(chunk.try_into().expect("4 bytes")));
    }
    Ok((dim, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_len() {
        let mut index = FlatIndex::new(3);
        assert!(index.is_empty());

        index.add(&[1.0, 0.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_add_wrong_dimension() {
        let mut index = FlatIndex::new(3);
        let err = index.add(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = FlatIndex::with_vectors(
            2,
            &[
                vec![10.0, 10.0], // far
                vec![0.0, 1.0],   // close
                vec![0.0, 0.1],   // closest
            ],
        )
        .unwrap();

        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![2, 1, 0]);
        assert!(hits[0].distance < hits[1].distance);
        assert!((hits[1].distance - 1.0).abs() < 1e-6, "L2, not squared L2");
    }

    #[test]
    fn test_search_k_larger_than_index() {
        let index = FlatIndex::with_vectors(2, &[vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
        let hits = index.search(&[0.0, 0.0], 100).unwrap();
        assert_eq!(hits.len(), 2, "never pads beyond the stored vectors");
    }

    #[test]
    fn test_search_tie_break_by_position() {
        let index =
            FlatIndex::with_vectors(2, &[vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_query_dimension_checked() {
        let index = FlatIndex::with_vectors(3, &[vec![0.0; 3]]).unwrap();
        assert!(index.search(&[0.0; 2], 1).is_err());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let index = FlatIndex::with_vectors(
            4,
            &[vec![0.1, 0.2, 0.3, 0.4], vec![-1.0, 2.5, 0.0, 9.75]],
        )
        .unwrap();

        let bytes = index.to_bytes();
        let restored = FlatIndex::from_bytes(&bytes).unwrap();
        assert_eq!(restored, index);
    }

    #[test]
    fn test_bytes_deterministic() {
        let index = FlatIndex::with_vectors(2, &[vec![0.5, -0.5]]).unwrap();
        assert_eq!(index.to_bytes(), index.to_bytes());
    }

    #[test]
    fn test_from_bytes_rejects_truncation() {
        let index = FlatIndex::with_vectors(2, &[vec![1.0, 2.0]]).unwrap();
        let mut bytes = index.to_bytes();
        bytes.pop();
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn test_from_bytes_rejects_wrong_magic() {
        let bytes = encode_rows(VECTORS_MAGIC, 2, &[1.0, 2.0]);
        assert!(matches!(
            FlatIndex::from_bytes(&bytes),
            Err(IndexError::Corrupt(_))
        ));
    }
}
