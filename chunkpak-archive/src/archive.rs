//! A generic, child-count-prefixed file table layered on a [`chunkpak::Decoder`]/
//! [`chunkpak::Encoder`] pair.
//!
//! The table layout is: a fixed-width child count, immediately followed by that many
//! fixed- or variable-length entry headers, immediately followed by the concatenated
//! payloads in header order. The header table's total length is never stored directly;
//! instead the first entry's `offset` field doubles as "where the header table ends,"
//! since by construction the first entry's payload always begins exactly there. Loading an
//! archive decodes that one entry first to learn the header table's length, then re-reads and
//! decodes the rest of the table in one pass.

use crate::entry::EntryCodec;
use crate::error::{Error, Result};
use chunkpak::codec::{BufferStream, Endian};
use chunkpak::{Decoder, EncodeFlags, Encoder, Variant};
use indexmap::IndexMap;
use std::path::Path;
use sync_file::RandomAccessFile;
use tracing::{debug, trace};

/// The width, in bytes, of the entry count field that leads an archive's header table.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ChildCountWidth {
    /// A 32-bit little-endian count.
    U32,
    /// A 64-bit little-endian count.
    U64,
}

impl ChildCountWidth {
    /// The on-disk size of the count field.
    pub fn byte_len(self) -> usize {
        match self {
            ChildCountWidth::U32 => 4,
            ChildCountWidth::U64 => 8,
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<u64> {
        let mut buf = BufferStream::new(bytes, Endian::Little);
        let n = match self {
            ChildCountWidth::U32 => buf.read::<u32>()? as u64,
            ChildCountWidth::U64 => buf.read::<u64>()?,
        };
        Ok(n)
    }

    fn encode(self, out: &mut Vec<u8>, value: u64) {
        match self {
            ChildCountWidth::U32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
            ChildCountWidth::U64 => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

/// The cap on how many bytes of header table are probed up front to decode the first entry
/// and learn the table's total length.
pub const MAX_ENTRY_HEADER_SIZE: usize = 0x200;

/// The fixed parameters of an archive kind: which container variant backs it, how wide its
/// entry count field is, and whether its logical stream is padded to a fixed minimum length.
#[derive(Clone, Debug)]
pub struct ArchiveConfig {
    /// The chunked container variant the archive is stored in.
    pub variant: Variant,
    /// The width of the leading entry-count field.
    pub child_count_width: ChildCountWidth,
    /// If set, [`Archive::save`] pads the logical stream up to this length before encoding.
    pub footer_pad: Option<u64>,
}

struct Entry<C> {
    header: C,
    payload: Option<Vec<u8>>,
}

/// A file table of entries, each described by a `C`-shaped header and backed by a chunked
/// container.
///
/// Entries are kept in insertion order (the order they were loaded or created in), not sorted
/// by name or offset; saving an archive writes them back out in that same order.
pub struct Archive<C: EntryCodec> {
    config: ArchiveConfig,
    entries: IndexMap<String, Entry<C>>,
    decoder: Option<Decoder<RandomAccessFile>>,
}

impl<C: EntryCodec> Archive<C> {
    /// Creates an empty archive with no backing file. Entries added with [`Archive::new_entry`]
    /// live entirely in memory until [`Archive::save`] is called.
    pub fn empty(config: ArchiveConfig) -> Self {
        Self {
            config,
            entries: IndexMap::new(),
            decoder: None,
        }
    }

    /// Opens the archive at `path` and decodes its header table.
    pub fn load(path: impl AsRef<Path>, config: ArchiveConfig) -> Result<Self> {
        let decoder = Decoder::open(path, config.variant).map_err(Error::Container)?;
        let width = config.child_count_width;

        let count_bytes = decoder.get(0, width.byte_len() as u64)?;
        let child_count = width.decode(&count_bytes)?;

        debug!(child_count, variant = config.variant.name(), "loading archive header table");

        let mut entries = IndexMap::new();
        if child_count > 0 {
            let header_table_end = match C::fixed_header_size() {
                Some(fixed) => width.byte_len() as u64 + child_count * fixed as u64,
                None => {
                    let probe = decoder.get(width.byte_len() as u64, MAX_ENTRY_HEADER_SIZE as u64)?;
                    let mut buf = BufferStream::new(&probe, Endian::Little);
                    let first = C::read(&mut buf).map_err(Error::Container)?;
                    first.offset()
                }
            };

            let table_len = header_table_end.saturating_sub(width.byte_len() as u64);
            let table_bytes = decoder.get(width.byte_len() as u64, table_len)?;
            let mut buf = BufferStream::new(&table_bytes, Endian::Little);
            for _ in 0..child_count {
                let header = C::read(&mut buf).map_err(Error::Container)?;
                trace!(name = header.name(), offset = header.offset(), size = header.size(), "read entry header");
                entries.insert(
                    header.name().to_string(),
                    Entry {
                        header,
                        payload: None,
                    },
                );
            }
        }

        Ok(Self {
            config,
            entries,
            decoder: Some(decoder),
        })
    }

    /// The entry names, in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns `true` if an entry named `name` exists.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The format tag of the named entry, if present.
    pub fn format(&self, name: &str) -> Option<C::Format> {
        self.entries.get(name).map(|e| e.header.format())
    }

    /// A reference to the named entry's decoded header.
    pub fn entry(&self, name: &str) -> Option<&C> {
        self.entries.get(name).map(|e| &e.header)
    }

    /// The named entry's `(offset, size)` header fields, without touching its payload.
    pub fn entry_location(&self, name: &str) -> Option<(u64, u64)> {
        self.entries.get(name).map(|e| (e.header.offset(), e.header.size()))
    }

    /// Overwrites the named entry's `offset`/`size` header fields directly, bypassing the
    /// payload-length bookkeeping [`Archive::save`] otherwise performs for them.
    ///
    /// For most codecs `offset`/`size` describe a location in this archive's own container
    /// and [`Archive::save`] recomputes them unconditionally, making this a no-op by the time
    /// saving finishes. It exists for codecs that return `Some` from
    /// [`EntryCodec::fixed_header_size`], whose `offset`/`size` fields describe a location in
    /// a different, paired container — `save` leaves those fields alone, relying on the
    /// caller to have set them correctly beforehand.
    pub fn set_location(&mut self, name: &str, offset: u64, size: u64) -> Result<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| Error::AbsentEntry(name.to_string()))?;
        entry.header.set_offset(offset);
        entry.header.set_size(size);
        Ok(())
    }

    /// Inserts a fully-formed header with no payload of its own.
    ///
    /// For codecs whose entries carry payload only in a paired container (see
    /// [`EntryCodec::fixed_header_size`]); [`Archive::new_entry`] is the right call for
    /// everything else.
    pub fn insert_header(&mut self, header: C) -> Result<()> {
        let name = header.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(Error::DuplicateEntry(name));
        }
        self.entries.insert(name, Entry { header, payload: Some(Vec::new()) });
        Ok(())
    }

    fn load_payload(
        decoder: &Option<Decoder<RandomAccessFile>>,
        entry: &mut Entry<C>,
    ) -> Result<()> {
        if entry.payload.is_some() {
            return Ok(());
        }
        let data = match decoder {
            Some(d) => d.get(entry.header.offset(), entry.header.size())?,
            None => Vec::new(),
        };
        entry.payload = Some(data);
        Ok(())
    }

    /// Returns the named entry's uncompressed payload, loading it from the backing container on
    /// first access and caching it thereafter. Returns an empty slice for an absent name.
    pub fn get(&mut self, name: &str) -> Result<&[u8]> {
        let Self { entries, decoder, .. } = self;
        let Some(entry) = entries.get_mut(name) else {
            return Ok(&[]);
        };
        Self::load_payload(decoder, entry)?;
        Ok(entry.payload.as_deref().unwrap())
    }

    /// Writes the named entry's payload to `path`.
    pub fn extract(&mut self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        if !self.entries.contains_key(name) {
            return Err(Error::AbsentEntry(name.to_string()));
        }
        let data = self.get(name)?;
        std::fs::write(path, data).map_err(chunkpak::Error::FileAccess)?;
        Ok(())
    }

    /// Writes every entry's payload into `dir`, naming each file `<entry name><ext>`, where
    /// `ext` is supplied by `extension_for` given the entry's format tag (an empty string if
    /// `extension_for` returns `None`).
    pub fn save_all(
        &mut self,
        dir: impl AsRef<Path>,
        extension_for: impl Fn(C::Format) -> Option<&'static str>,
    ) -> Result<()> {
        let dir = dir.as_ref();
        let names: Vec<String> = self.entries.keys().cloned().collect();
        for name in names {
            let format = self.entries[&name].header.format();
            let ext = extension_for(format).unwrap_or("");
            let path = dir.join(format!("{name}{ext}"));
            self.extract(&name, path)?;
        }
        Ok(())
    }

    /// Adds a new entry with the given name, format tag, and payload.
    ///
    /// Fails with [`Error::DuplicateEntry`] if an entry with that name already exists.
    pub fn new_entry(&mut self, name: &str, format: C::Format, data: Vec<u8>) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(Error::DuplicateEntry(name.to_string()));
        }
        let mut header = C::new(name, format);
        header.set_size(data.len() as u64);
        self.entries.insert(
            name.to_string(),
            Entry {
                header,
                payload: Some(data),
            },
        );
        Ok(())
    }

    /// Replaces the named entry's payload.
    ///
    /// Fails with [`Error::AbsentEntry`] if no entry with that name exists.
    pub fn set_data(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| Error::AbsentEntry(name.to_string()))?;
        entry.header.set_size(data.len() as u64);
        entry.payload = Some(data);
        Ok(())
    }

    /// Replaces the named entry's format tag.
    ///
    /// Fails with [`Error::AbsentEntry`] if no entry with that name exists.
    pub fn set_format(&mut self, name: &str, format: C::Format) -> Result<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| Error::AbsentEntry(name.to_string()))?;
        entry.header.set_format(format);
        Ok(())
    }

    /// Removes the named entry.
    ///
    /// Fails with [`Error::AbsentEntry`] if no entry with that name exists.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.entries
            .shift_remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::AbsentEntry(name.to_string()))
    }

    /// Forces every entry's payload into memory. [`Archive::save`] calls this before
    /// recomputing offsets, since the new layout depends on knowing every payload's size.
    ///
    /// A no-op for codecs with [`EntryCodec::fixed_header_size`] set: their `offset`/`size`
    /// fields describe a location in a different container, so fetching "this entry's
    /// payload" from this archive's own decoder would read unrelated bytes.
    fn expand(&mut self) -> Result<()> {
        if C::fixed_header_size().is_some() {
            return Ok(());
        }
        let Self { entries, decoder, .. } = self;
        for entry in entries.values_mut() {
            Self::load_payload(decoder, entry)?;
        }
        Ok(())
    }

    /// Rewrites the archive to `path`: recomputes the header table and every entry's offset,
    /// then encodes the result as this archive's configured container variant.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.expand()?;

        let width = self.config.child_count_width;
        let header_table_len: u64 = width.byte_len() as u64
            + self
                .entries
                .values()
                .map(|e| e.header.header_size() as u64)
                .sum::<u64>();

        // Codecs with a content-independent header size (see `fixed_header_size`) describe a
        // location in a different, paired container through `offset`/`size`; leave those
        // fields as the caller set them via `set_location` rather than overwriting them with
        // a position in this archive's own payload region, and never write a payload of their
        // own (there isn't one to write).
        let carries_own_payload = C::fixed_header_size().is_none();
        if carries_own_payload {
            let mut cursor = header_table_len;
            for entry in self.entries.values_mut() {
                entry.header.set_offset(cursor);
                let len = entry.payload.as_ref().map(Vec::len).unwrap_or(0) as u64;
                entry.header.set_size(len);
                cursor += len;
            }
        }

        let mut out = Vec::with_capacity(header_table_len as usize);
        width.encode(&mut out, self.entries.len() as u64);
        for entry in self.entries.values() {
            entry.header.write(&mut out);
        }
        debug_assert_eq!(out.len() as u64, header_table_len);

        if carries_own_payload {
            for entry in self.entries.values() {
                out.extend_from_slice(entry.payload.as_deref().unwrap_or(&[]));
            }
        }

        if let Some(pad) = self.config.footer_pad {
            if (out.len() as u64) < pad {
                out.resize(pad as usize, 0);
            }
        }

        debug!(
            entries = self.entries.len(),
            logical_len = out.len(),
            variant = self.config.variant.name(),
            "saving archive"
        );

        let tmp = tempfile::NamedTempFile::new().map_err(chunkpak::Error::FileAccess)?;
        std::fs::write(tmp.path(), &out).map_err(chunkpak::Error::FileAccess)?;

        Encoder::new(self.config.variant)
            .with_flags(EncodeFlags::MINIMAL_FILESIZE)
            .encode(tmp.path(), path.as_ref())
            .map_err(Error::Container)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct TestEntry {
        name: String,
        offset: u64,
        size: u64,
        format: u16,
    }

    impl EntryCodec for TestEntry {
        type Format = u16;

        fn read(buf: &mut BufferStream) -> chunkpak::Result<Self> {
            let offset = buf.read::<u64>()?;
            let size = buf.read::<u64>()?;
            let format = buf.read::<u16>()?;
            let name_len = buf.read::<u16>()? as usize;
            let name = buf.read_fixed_string(name_len)?;
            Ok(TestEntry { name, offset, size, format })
        }

        fn write(&self, out: &mut Vec<u8>) {
            out.extend_from_slice(&self.offset.to_le_bytes());
            out.extend_from_slice(&self.size.to_le_bytes());
            out.extend_from_slice(&self.format.to_le_bytes());
            out.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
            out.extend_from_slice(self.name.as_bytes());
        }

        fn header_size(&self) -> usize {
            8 + 8 + 2 + 2 + self.name.len()
        }

        fn new(name: &str, format: Self::Format) -> Self {
            TestEntry { name: name.to_string(), offset: 0, size: 0, format }
        }

        fn name(&self) -> &str {
            &self.name
        }
        fn offset(&self) -> u64 {
            self.offset
        }
        fn set_offset(&mut self, offset: u64) {
            self.offset = offset;
        }
        fn size(&self) -> u64 {
            self.size
        }
        fn set_size(&mut self, size: u64) {
            self.size = size;
        }
        fn format(&self) -> Self::Format {
            self.format
        }
        fn set_format(&mut self, format: Self::Format) {
            self.format = format;
        }
    }

    fn config() -> ArchiveConfig {
        ArchiveConfig {
            variant: Variant::H1A,
            child_count_width: ChildCountWidth::U32,
            footer_pad: None,
        }
    }

    #[test]
    fn round_trips_entries_through_save_and_load() {
        let mut archive: Archive<TestEntry> = Archive::empty(config());
        archive.new_entry("a.bin", 1, vec![1, 2, 3]).unwrap();
        archive.new_entry("b.bin", 2, vec![4, 5, 6, 7, 8]).unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        archive.save(file.path()).unwrap();

        let mut loaded: Archive<TestEntry> = Archive::load(file.path(), config()).unwrap();
        assert_eq!(loaded.list().collect::<Vec<_>>(), ["a.bin", "b.bin"]);
        assert_eq!(loaded.get("a.bin").unwrap(), &[1, 2, 3]);
        assert_eq!(loaded.get("b.bin").unwrap(), &[4, 5, 6, 7, 8]);
        assert_eq!(loaded.format("b.bin"), Some(2));
    }

    #[test]
    fn delete_preserves_remaining_order() {
        let mut archive: Archive<TestEntry> = Archive::empty(config());
        archive.new_entry("a", 0, vec![1]).unwrap();
        archive.new_entry("b", 0, vec![2]).unwrap();
        archive.new_entry("c", 0, vec![3]).unwrap();
        archive.delete("b").unwrap();
        assert_eq!(archive.list().collect::<Vec<_>>(), ["a", "c"]);
    }

    #[test]
    fn mutators_fail_on_absent_entry() {
        let mut archive: Archive<TestEntry> = Archive::empty(config());
        assert!(matches!(
            archive.set_data("missing", vec![]),
            Err(Error::AbsentEntry(_))
        ));
        assert!(matches!(
            archive.delete("missing"),
            Err(Error::AbsentEntry(_))
        ));
    }

    #[test]
    fn new_entry_rejects_duplicate_name() {
        let mut archive: Archive<TestEntry> = Archive::empty(config());
        archive.new_entry("a", 0, vec![1]).unwrap();
        assert!(matches!(
            archive.new_entry("a", 0, vec![2]),
            Err(Error::DuplicateEntry(_))
        ));
    }
}
