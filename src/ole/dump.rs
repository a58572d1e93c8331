//! Diagnostic dumps of a compound file.
//!
//! [`write_xml`] renders the hierarchy as nested `<storage>` and `<stream>`
//! elements with hex-encoded payloads. [`extract_streams`] writes the
//! streams of the root storage to individual files.

use super::file::{CompoundFile, Storage};
use crate::common::error::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

enum Step<'a, R> {
    Enter(Storage<'a, R>),
    Leave,
}

fn hex(data: &[u8]) -> String {
    let mut text = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(text, "{:02X}", byte);
    }
    text
}

/// Serialize the whole hierarchy as indented XML.
///
/// The root storage is written with the name `root`; stream elements carry
/// their display name and a `data` attribute with the payload in hex.
pub fn write_xml<R: Read + Seek, W: Write>(file: &CompoundFile<R>, out: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    let mut steps = vec![Step::Enter(file.root()?)];
    let mut first = true;

    while let Some(step) = steps.pop() {
        let storage = match step {
            Step::Enter(storage) => storage,
            Step::Leave => {
                writer.write_event(Event::End(BytesEnd::new("storage")))?;
                continue;
            },
        };

        let name = if first {
            "root".to_string()
        } else {
            storage.name().to_string()
        };
        first = false;
        let mut element = BytesStart::new("storage");
        element.push_attribute(("name", name.as_str()));
        writer.write_event(Event::Start(element))?;

        for stream in storage.streams()? {
            let data = stream.read_all()?;
            let display = stream.display_name();
            let encoded = hex(&data);
            let mut element = BytesStart::new("stream");
            element.push_attribute(("name", display.as_str()));
            element.push_attribute(("data", encoded.as_str()));
            writer.write_event(Event::Empty(element))?;
        }

        steps.push(Step::Leave);
        for sub in storage.sub_storages()?.into_iter().rev() {
            steps.push(Step::Enter(sub));
        }
    }
    Ok(())
}

/// Render [`write_xml`] output into a string.
pub fn to_xml_string<R: Read + Seek>(file: &CompoundFile<R>) -> Result<String> {
    let mut buffer = Vec::new();
    write_xml(file, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Replace characters that cannot appear in a file name.
fn file_name_for(display_name: &str) -> String {
    let name: String = display_name
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    match name.as_str() {
        "" | "." | ".." => format!("_{}", name),
        _ => name,
    }
}

/// Pick a file name for `display_name` that no earlier stream has taken.
///
/// Names are compared case-insensitively so that "Data" and "DATA" do not
/// end up in the same file on case-insensitive file systems. A clash gets
/// a `_2`, `_3`, ... suffix.
fn unique_file_name(display_name: &str, taken: &mut HashSet<String>) -> String {
    let base = file_name_for(display_name);
    let mut name = base.clone();
    let mut counter = 1u32;
    while !taken.insert(name.to_lowercase()) {
        counter += 1;
        name = format!("{}_{}", base, counter);
    }
    name
}

/// Write every stream of the root storage into `dir`, one file per stream,
/// named after its display name. Colliding names are made unique with a
/// numeric suffix. Returns the created paths in enumeration order.
pub fn extract_streams<R: Read + Seek>(file: &CompoundFile<R>, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut taken = HashSet::new();
    let mut written = Vec::new();
    for stream in file.root()?.streams()? {
        let path = dir.join(unique_file_name(&stream.display_name(), &mut taken));
        let mut out = fs::File::create(&path)?;
        let bytes = stream.copy_to(&mut out)?;
        debug!(path = %path.display(), bytes, "extracted stream");
        written.push(path);
    }
    Ok(written)
}
