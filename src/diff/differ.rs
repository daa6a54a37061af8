//! Lockstep buffer walk and divergence reporting

use crate::itdb::cursor::Cursor;
use crate::itdb::tags::{magic_label, ChunkPath, ChunkTag};
use serde::Serialize;

/// Smallest extent any chunk can occupy; used to guarantee forward
/// progress when realigning over corrupt lengths.
const MIN_CHUNK: usize = 12;

/// One field-level mismatch between two serialized databases.
///
/// `offset` is the byte offset in the expected (left) buffer; `path` names
/// the chunk the field belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct Divergence {
    pub path: String,
    pub offset: usize,
    pub field: String,
    pub expected: String,
    pub actual: String,
}

/// Compare two serialized databases field by field.
///
/// The walk follows the same traversal rules as the decoder: sized chunks
/// advance by their declared total length, list chunks by their children.
/// After a mismatch both sides realign on their own declared lengths and
/// the walk continues with the next sibling, so a single corruption does
/// not mask later ones.
pub fn diff(expected: &[u8], actual: &[u8]) -> Vec<Divergence> {
    if expected.is_empty() && actual.is_empty() {
        return Vec::new();
    }
    let mut walker = Walker {
        left: Cursor::new(expected),
        right: Cursor::new(actual),
        path: ChunkPath::root(),
        out: Vec::new(),
    };
    walker.chunk(0, expected.len(), 0, actual.len(), 0);
    walker.out
}

/// Named non-envelope fields compared (and excluded from the byte scan)
/// per chunk tag.
fn named_fields(tag: Option<ChunkTag>) -> &'static [(usize, &'static str)] {
    match tag {
        Some(ChunkTag::Database) => &[(20, "section_count")],
        Some(ChunkTag::Track) => &[(12, "dataobject_count"), (16, "track_id")],
        Some(ChunkTag::Album) | Some(ChunkTag::Member) => &[(12, "dataobject_count")],
        Some(ChunkTag::Playlist) => &[(0x0C, "dataobject_count"), (0x10, "member_count")],
        _ => &[],
    }
}

/// Extent of a single chunk for realignment purposes: declared total for
/// sized and unknown chunks, header plus walked children for lists.
fn chunk_extent(cur: &Cursor, offset: usize, end: usize) -> usize {
    let avail = end.saturating_sub(offset);
    let magic = match cur.read_magic_at(offset) {
        Ok(m) => m,
        Err(_) => return avail,
    };
    let header_len = cur
        .read_u32_at(offset + 4)
        .map(|v| v as usize)
        .unwrap_or(avail);
    let word8 = cur.read_u32_at(offset + 8).map(|v| v as usize).unwrap_or(0);

    match ChunkTag::from_magic(magic) {
        Some(tag) if tag.is_list() => {
            let mut off = offset + header_len.max(MIN_CHUNK);
            for _ in 0..word8 {
                if off >= end {
                    break;
                }
                off += chunk_extent(cur, off, end).max(MIN_CHUNK);
            }
            off.min(end) - offset
        }
        _ => word8.max(MIN_CHUNK).min(avail),
    }
}

struct Walker<'a> {
    left: Cursor<'a>,
    right: Cursor<'a>,
    path: ChunkPath,
    out: Vec<Divergence>,
}

impl<'a> Walker<'a> {
    fn report(&mut self, offset: usize, field: &str, expected: String, actual: String) {
        self.out.push(Divergence {
            path: self.path.to_string(),
            offset,
            field: field.to_string(),
            expected,
            actual,
        });
    }

    /// Compare one chunk pair; returns the extent consumed on each side.
    fn chunk(
        &mut self,
        lo: usize,
        l_end: usize,
        ro: usize,
        r_end: usize,
        index: usize,
    ) -> (usize, usize) {
        let lm = self.left.read_magic_at(lo).ok();
        let rm = self.right.read_magic_at(ro).ok();
        let (lm, rm) = match (lm, rm) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                let expected = lm
                    .map(magic_label)
                    .unwrap_or_else(|| "end of buffer".to_string());
                let actual = rm
                    .map(magic_label)
                    .unwrap_or_else(|| "end of buffer".to_string());
                self.report(lo, "chunk", expected, actual);
                return (l_end.saturating_sub(lo), r_end.saturating_sub(ro));
            }
        };

        self.path.push(lm, index);
        if lm != rm {
            self.report(lo, "magic", magic_label(lm), magic_label(rm));
            let le = chunk_extent(&self.left, lo, l_end);
            let re = chunk_extent(&self.right, ro, r_end);
            self.path.pop();
            return (le, re);
        }

        let tag = ChunkTag::from_magic(lm);
        let is_list = matches!(tag, Some(t) if t.is_list());

        let lhl = self.left.read_u32_at(lo + 4).unwrap_or(0) as usize;
        let rhl = self.right.read_u32_at(ro + 4).unwrap_or(0) as usize;
        if lhl != rhl {
            self.report(lo + 4, "header_len", lhl.to_string(), rhl.to_string());
        }

        let l8 = self.left.read_u32_at(lo + 8).unwrap_or(0);
        let r8 = self.right.read_u32_at(ro + 8).unwrap_or(0);
        if l8 != r8 {
            let name = if is_list { "child_count" } else { "total_len" };
            self.report(lo + 8, name, l8.to_string(), r8.to_string());
        }

        let named = named_fields(tag);
        for &(off, name) in named {
            let lv = self.left.read_u32_at(lo + off).unwrap_or(0);
            let rv = self.right.read_u32_at(ro + off).unwrap_or(0);
            if lv != rv {
                self.report(lo + off, name, lv.to_string(), rv.to_string());
            }
        }

        // First difference among the remaining header bytes.
        let l_header = self
            .left
            .read_bytes_at(lo, lhl.min(l_end.saturating_sub(lo)))
            .unwrap_or(&[]);
        let r_header = self
            .right
            .read_bytes_at(ro, rhl.min(r_end.saturating_sub(ro)))
            .unwrap_or(&[]);
        let common = l_header.len().min(r_header.len());
        for i in MIN_CHUNK..common {
            if named.iter().any(|&(off, _)| (off..off + 4).contains(&i)) {
                continue;
            }
            if l_header[i] != r_header[i] {
                self.report(
                    lo + i,
                    &format!("header[+0x{i:02x}]"),
                    format!("0x{:02x}", l_header[i]),
                    format!("0x{:02x}", r_header[i]),
                );
                break;
            }
        }

        let l_total = (l8 as usize).max(MIN_CHUNK).min(l_end.saturating_sub(lo));
        let r_total = (r8 as usize).max(MIN_CHUNK).min(r_end.saturating_sub(ro));
        let l_chunk_end = lo + l_total;
        let r_chunk_end = ro + r_total;

        let extents = match tag {
            Some(ChunkTag::Database) => {
                let lc = self.left.read_u32_at(lo + 20).unwrap_or(0) as usize;
                let rc = self.right.read_u32_at(ro + 20).unwrap_or(0) as usize;
                self.descend(lo + lhl, l_chunk_end, ro + rhl, r_chunk_end, lc, rc);
                (l_total, r_total)
            }
            Some(ChunkTag::Section) => {
                if lo + lhl < l_chunk_end && ro + rhl < r_chunk_end {
                    self.chunk(lo + lhl, l_chunk_end, ro + rhl, r_chunk_end, 0);
                }
                (l_total, r_total)
            }
            Some(t) if t.is_list() => {
                let (l_fin, r_fin) =
                    self.descend(lo + lhl, l_end, ro + rhl, r_end, l8 as usize, r8 as usize);
                (l_fin - lo, r_fin - ro)
            }
            Some(ChunkTag::Track) | Some(ChunkTag::Album) | Some(ChunkTag::Member) => {
                let lc = self.left.read_u32_at(lo + 12).unwrap_or(0) as usize;
                let rc = self.right.read_u32_at(ro + 12).unwrap_or(0) as usize;
                self.descend(lo + lhl, l_chunk_end, ro + rhl, r_chunk_end, lc, rc);
                (l_total, r_total)
            }
            Some(ChunkTag::Playlist) => {
                let lc = self.left.read_u32_at(lo + 0x0C).unwrap_or(0) as usize;
                let rc = self.right.read_u32_at(ro + 0x0C).unwrap_or(0) as usize;
                let (l_mid, r_mid) =
                    self.descend(lo + lhl, l_chunk_end, ro + rhl, r_chunk_end, lc, rc);
                let lmc = self.left.read_u32_at(lo + 0x10).unwrap_or(0) as usize;
                let rmc = self.right.read_u32_at(ro + 0x10).unwrap_or(0) as usize;
                self.descend(l_mid, l_chunk_end, r_mid, r_chunk_end, lmc, rmc);
                (l_total, r_total)
            }
            // Data objects and unknown chunks are leaves: compare bodies.
            _ => {
                let l_body = self
                    .left
                    .read_bytes_at(lo + lhl, l_chunk_end.saturating_sub(lo + lhl))
                    .unwrap_or(&[]);
                let r_body = self
                    .right
                    .read_bytes_at(ro + rhl, r_chunk_end.saturating_sub(ro + rhl))
                    .unwrap_or(&[]);
                let span = l_body.len().min(r_body.len());
                for i in 0..span {
                    if l_body[i] != r_body[i] {
                        self.report(
                            lo + lhl + i,
                            &format!("payload[+0x{i:02x}]"),
                            format!("0x{:02x}", l_body[i]),
                            format!("0x{:02x}", r_body[i]),
                        );
                        break;
                    }
                }
                (l_total, r_total)
            }
        };

        self.path.pop();
        extents
    }

    /// Walk `min(l_count, r_count)` child pairs, then skip any unpaired
    /// children so sibling alignment survives for the parent.
    fn descend(
        &mut self,
        mut lo: usize,
        l_end: usize,
        mut ro: usize,
        r_end: usize,
        l_count: usize,
        r_count: usize,
    ) -> (usize, usize) {
        let pairs = l_count.min(r_count);
        for index in 0..pairs {
            if lo >= l_end || ro >= r_end {
                break;
            }
            let (le, re) = self.chunk(lo, l_end, ro, r_end, index);
            lo += le.max(MIN_CHUNK);
            ro += re.max(MIN_CHUNK);
        }
        for _ in pairs..l_count {
            if lo >= l_end {
                break;
            }
            lo += chunk_extent(&self.left, lo, l_end).max(MIN_CHUNK);
        }
        for _ in pairs..r_count {
            if ro >= r_end {
                break;
            }
            ro += chunk_extent(&self.right, ro, r_end).max(MIN_CHUNK);
        }
        (lo.min(l_end), ro.min(r_end))
    }
}
