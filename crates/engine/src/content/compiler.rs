use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::info;

use crate::grid::{BuriedItem, GridCoordinate, GRID_WIDTH_MAX};
use crate::world::Pickup;
use crate::AppPaths;

use super::database::{DefDatabase, PlaceableDef};
use super::discovery::plan_mod_sources;
use super::types::{ContentDiscoveryError, ContentRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    Discovery,
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDefInMod,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub mod_id: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (mod={}, file={}, line={}, column={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (mod={}, file={})",
                self.code,
                self.message,
                self.mod_id,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

#[derive(Debug, Clone)]
enum CompiledDef {
    BuriedItem(BuriedItem),
    Placeable(PlaceableDef),
}

impl CompiledDef {
    fn def_name(&self) -> &str {
        match self {
            Self::BuriedItem(item) => &item.def_name,
            Self::Placeable(def) => &def.def_name,
        }
    }
}

/// Context shared by every error raised while parsing one file.
struct ParseCtx<'a, 'input> {
    mod_id: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl ParseCtx<'_, '_> {
    fn error(&self, code: ContentErrorCode, message: String, node: Node<'_, '_>) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_text(&self, node: Node<'_, '_>, field_name: &str) -> Result<String, ContentCompileError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error(
                ContentErrorCode::MissingField,
                format!("field <{}> must not be empty", field_name),
                node,
            ));
        }
        Ok(value)
    }

    fn required_int<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        field_name: &str,
    ) -> Result<T, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        value.parse::<T>().map_err(|_| {
            self.error(
                ContentErrorCode::InvalidValue,
                format!("{} '{}' is not a valid integer", field_name, value),
                node,
            )
        })
    }

    fn missing(&self, field_name: &str, def_type: &str, node: Node<'_, '_>) -> ContentCompileError {
        self.error(
            ContentErrorCode::MissingField,
            format!("missing required field <{}> in <{}>", field_name, def_type),
            node,
        )
    }

    fn check_unique(
        &self,
        seen_fields: &mut HashSet<String>,
        field: Node<'_, '_>,
        def_type: &str,
    ) -> Result<String, ContentCompileError> {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(self.error(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <{}>", field_name, def_type),
                field,
            ));
        }
        Ok(field_name)
    }
}

pub fn compile_def_database(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<DefDatabase, ContentCompileError> {
    let sources = plan_mod_sources(app_paths, request)
        .map_err(|error| map_discovery_error(error, &app_paths.root))?;

    let mut buried_items = BTreeMap::<String, BuriedItem>::new();
    let mut placeables = BTreeMap::<String, PlaceableDef>::new();

    for source in sources {
        let mut seen_in_mod = HashSet::<String>::new();

        for xml_file in &source.xml_files {
            let raw = fs::read_to_string(xml_file)
                .map_err(|source_err| read_error(&source.mod_id, xml_file.clone(), source_err))?;
            for def in parse_defs_document(&source.mod_id, xml_file, &raw)? {
                if !seen_in_mod.insert(def.def_name().to_string()) {
                    return Err(ContentCompileError {
                        code: ContentErrorCode::DuplicateDefInMod,
                        message: format!(
                            "duplicate def '{}' in mod '{}'; each mod may define a defName only once",
                            def.def_name(),
                            source.mod_id
                        ),
                        mod_id: source.mod_id.clone(),
                        file_path: xml_file.clone(),
                        location: None,
                    });
                }
                // Later mods override earlier ones by name.
                match def {
                    CompiledDef::BuriedItem(item) => {
                        buried_items.insert(item.def_name.clone(), item);
                    }
                    CompiledDef::Placeable(def) => {
                        placeables.insert(def.def_name.clone(), def);
                    }
                }
            }
        }
        info!(
            mod_id = %source.mod_id,
            xml_file_count = source.xml_files.len(),
            "content_mod_compiled"
        );
    }

    Ok(DefDatabase::from_defs(
        buried_items.into_values(),
        placeables.into_values(),
    ))
}

fn parse_defs_document(
    mod_id: &str,
    file_path: &Path,
    raw: &str,
) -> Result<Vec<CompiledDef>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        mod_id: mod_id.to_string(),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = ParseCtx {
        mod_id,
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(ctx.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::new();
    for child in root.children().filter(|node| node.is_element()) {
        let def = match child.tag_name().name() {
            "BuriedItemDef" => CompiledDef::BuriedItem(parse_buried_item_def(&ctx, child)?),
            "PlaceableDef" => CompiledDef::Placeable(parse_placeable_def(&ctx, child)?),
            other => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownDefType,
                    format!(
                        "unsupported def type <{}>; expected <BuriedItemDef> or <PlaceableDef>",
                        other
                    ),
                    child,
                ))
            }
        };
        defs.push(def);
    }

    Ok(defs)
}

fn parse_buried_item_def(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
) -> Result<BuriedItem, ContentCompileError> {
    const DEF_TYPE: &str = "BuriedItemDef";
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut detection_radius: Option<i32> = None;
    let mut detection_rarity: Option<i32> = None;
    let mut rewards = Vec::new();

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = ctx.check_unique(&mut seen_fields, field, DEF_TYPE)?;
        match field_name.as_str() {
            "defName" => def_name = Some(ctx.required_text(field, "defName")?),
            "detectionRadius" => {
                let radius = ctx.required_int::<i32>(field, "detectionRadius")?;
                if !(0..=max_extent()).contains(&radius) {
                    return Err(ctx.error(
                        ContentErrorCode::InvalidValue,
                        format!("detectionRadius must be in 0..={}", max_extent()),
                        field,
                    ));
                }
                detection_radius = Some(radius);
            }
            "detectionRarity" => {
                detection_rarity = Some(ctx.required_int::<i32>(field, "detectionRarity")?);
            }
            "rewards" => {
                for entry in field.children().filter(|child| child.is_element()) {
                    if entry.tag_name().name() != "li" {
                        return Err(ctx.error(
                            ContentErrorCode::UnknownField,
                            format!("<rewards> entries must be <li>, got <{}>", entry.tag_name().name()),
                            entry,
                        ));
                    }
                    rewards.push(parse_reward(ctx, entry)?);
                }
            }
            _ => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <{}>", field_name, DEF_TYPE),
                    field,
                ))
            }
        }
    }

    let Some(def_name) = def_name else {
        return Err(ctx.missing("defName", DEF_TYPE, node));
    };
    let Some(detection_radius) = detection_radius else {
        return Err(ctx.missing("detectionRadius", DEF_TYPE, node));
    };
    let Some(detection_rarity) = detection_rarity else {
        return Err(ctx.missing("detectionRarity", DEF_TYPE, node));
    };

    Ok(BuriedItem {
        def_name,
        detection_radius,
        detection_rarity,
        rewards,
    })
}

fn parse_reward(ctx: &ParseCtx<'_, '_>, node: Node<'_, '_>) -> Result<Pickup, ContentCompileError> {
    const DEF_TYPE: &str = "li";
    let mut seen_fields = HashSet::<String>::new();
    let mut item: Option<String> = None;
    let mut stack_size: u8 = 1;
    let mut quality: u8 = 1;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = ctx.check_unique(&mut seen_fields, field, DEF_TYPE)?;
        match field_name.as_str() {
            "item" => item = Some(ctx.required_text(field, "item")?),
            "stackSize" => stack_size = ctx.required_int::<u8>(field, "stackSize")?,
            "quality" => quality = ctx.required_int::<u8>(field, "quality")?,
            _ => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in reward <li>", field_name),
                    field,
                ))
            }
        }
    }

    let Some(def_name) = item else {
        return Err(ctx.missing("item", DEF_TYPE, node));
    };
    if stack_size == 0 || quality == 0 {
        return Err(ctx.error(
            ContentErrorCode::InvalidValue,
            "reward stackSize and quality must be >= 1".to_string(),
            node,
        ));
    }

    Ok(Pickup {
        def_name,
        stack_size,
        quality,
    })
}

fn parse_placeable_def(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
) -> Result<PlaceableDef, ContentCompileError> {
    const DEF_TYPE: &str = "PlaceableDef";
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut footprint: Option<GridCoordinate> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = ctx.check_unique(&mut seen_fields, field, DEF_TYPE)?;
        match field_name.as_str() {
            "defName" => def_name = Some(ctx.required_text(field, "defName")?),
            "label" => label = Some(ctx.required_text(field, "label")?),
            "footprint" => {
                let value = ctx.required_text(field, "footprint")?;
                let parsed = parse_footprint(&value).ok_or_else(|| {
                    ctx.error(
                        ContentErrorCode::InvalidValue,
                        format!(
                            "footprint '{}' must be 'W,H' with both values in 1..={}",
                            value,
                            max_extent()
                        ),
                        field,
                    )
                })?;
                footprint = Some(parsed);
            }
            _ => {
                return Err(ctx.error(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <{}>", field_name, DEF_TYPE),
                    field,
                ))
            }
        }
    }

    let Some(def_name) = def_name else {
        return Err(ctx.missing("defName", DEF_TYPE, node));
    };
    let label = label.unwrap_or_else(|| def_name.clone());

    Ok(PlaceableDef {
        def_name,
        label,
        footprint: footprint.unwrap_or(GridCoordinate::ONE),
    })
}

fn parse_footprint(value: &str) -> Option<GridCoordinate> {
    let (w, h) = value.split_once(',')?;
    let w = w.trim().parse::<i32>().ok()?;
    let h = h.trim().parse::<i32>().ok()?;
    let extent = 1..=max_extent();
    (extent.contains(&w) && extent.contains(&h)).then_some(GridCoordinate::new(w, h))
}

/// Nothing larger fits on the widest grid.
fn max_extent() -> i32 {
    GRID_WIDTH_MAX as i32
}

fn read_error(mod_id: &str, path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML file: {source}"),
        mod_id: mod_id.to_string(),
        file_path: path,
        location: None,
    }
}

fn map_discovery_error(error: ContentDiscoveryError, root: &Path) -> ContentCompileError {
    match error {
        ContentDiscoveryError::EnabledModMissing {
            mod_id,
            expected_dir,
        } => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: format!(
                "enabled mod '{}' not found at {}; check enabled mod list",
                mod_id,
                expected_dir.display()
            ),
            mod_id,
            file_path: expected_dir,
            location: None,
        },
        ContentDiscoveryError::ReadDir {
            mod_id,
            path,
            source,
        } => read_error(&mod_id, path, source),
        other => ContentCompileError {
            code: ContentErrorCode::Discovery,
            message: other.to_string(),
            mod_id: "<discovery>".to_string(),
            file_path: root.to_path_buf(),
            location: None,
        },
    }
}
