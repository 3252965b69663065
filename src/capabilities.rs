//! Declarative capability negotiation.
//!
//! The initialize handshake is a vocabulary exchange: the client declares
//! which optional protocol features it understands, the server answers with
//! what it provides. Internally each feature set is a bitmask; every bit
//! corresponds to exactly one canonical wire token (a string or an integer).
//! Building the `initialize` request ORs configured flags into JSON arrays;
//! parsing the server's answer ORs recognized tokens back into flags and
//! ignores everything unrecognized, which keeps the exchange
//! forward-compatible with servers speaking newer protocol revisions.
//!
//! Nothing in here is clever; correctness means spelling-exact fidelity to
//! the wire vocabulary, so the tables below stay flat and obvious.

use crate::json::{unescape_text, JsonValue};

// =============================================================================
// Wire vocabulary tables
// =============================================================================

/// Symbol kinds (`SymbolKind`), wire values 1–26.
pub mod symbol_kind {
    pub const FILE: u32 = 1 << 0;
    pub const MODULE: u32 = 1 << 1;
    pub const NAMESPACE: u32 = 1 << 2;
    pub const PACKAGE: u32 = 1 << 3;
    pub const CLASS: u32 = 1 << 4;
    pub const METHOD: u32 = 1 << 5;
    pub const PROPERTY: u32 = 1 << 6;
    pub const FIELD: u32 = 1 << 7;
    pub const CONSTRUCTOR: u32 = 1 << 8;
    pub const ENUM: u32 = 1 << 9;
    pub const INTERFACE: u32 = 1 << 10;
    pub const FUNCTION: u32 = 1 << 11;
    pub const VARIABLE: u32 = 1 << 12;
    pub const CONSTANT: u32 = 1 << 13;
    pub const STRING: u32 = 1 << 14;
    pub const NUMBER: u32 = 1 << 15;
    pub const BOOLEAN: u32 = 1 << 16;
    pub const ARRAY: u32 = 1 << 17;
    pub const OBJECT: u32 = 1 << 18;
    pub const KEY: u32 = 1 << 19;
    pub const NULL: u32 = 1 << 20;
    pub const ENUM_MEMBER: u32 = 1 << 21;
    pub const STRUCT: u32 = 1 << 22;
    pub const EVENT: u32 = 1 << 23;
    pub const OPERATOR: u32 = 1 << 24;
    pub const TYPE_PARAMETER: u32 = 1 << 25;
    pub const ALL: u32 = (1 << 26) - 1;
}

/// bit → wire value, in canonical order. The wire value is always bit
/// position + 1, but the table keeps the mapping explicit and greppable.
const SYMBOL_KIND_TABLE: &[(u32, i64, &str)] = &[
    (symbol_kind::FILE, 1, "File"),
    (symbol_kind::MODULE, 2, "Module"),
    (symbol_kind::NAMESPACE, 3, "Namespace"),
    (symbol_kind::PACKAGE, 4, "Package"),
    (symbol_kind::CLASS, 5, "Class"),
    (symbol_kind::METHOD, 6, "Method"),
    (symbol_kind::PROPERTY, 7, "Property"),
    (symbol_kind::FIELD, 8, "Field"),
    (symbol_kind::CONSTRUCTOR, 9, "Constructor"),
    (symbol_kind::ENUM, 10, "Enum"),
    (symbol_kind::INTERFACE, 11, "Interface"),
    (symbol_kind::FUNCTION, 12, "Function"),
    (symbol_kind::VARIABLE, 13, "Variable"),
    (symbol_kind::CONSTANT, 14, "Constant"),
    (symbol_kind::STRING, 15, "String"),
    (symbol_kind::NUMBER, 16, "Number"),
    (symbol_kind::BOOLEAN, 17, "Boolean"),
    (symbol_kind::ARRAY, 18, "Array"),
    (symbol_kind::OBJECT, 19, "Object"),
    (symbol_kind::KEY, 20, "Key"),
    (symbol_kind::NULL, 21, "Null"),
    (symbol_kind::ENUM_MEMBER, 22, "EnumMember"),
    (symbol_kind::STRUCT, 23, "Struct"),
    (symbol_kind::EVENT, 24, "Event"),
    (symbol_kind::OPERATOR, 25, "Operator"),
    (symbol_kind::TYPE_PARAMETER, 26, "TypeParameter"),
];

/// Display name for a raw symbol-kind wire value, e.g. for a symbol outline.
pub fn symbol_kind_name(kind: i64) -> &'static str {
    SYMBOL_KIND_TABLE
        .iter()
        .find(|(_, wire, _)| *wire == kind)
        .map(|(_, _, name)| *name)
        .unwrap_or("Unknown")
}

/// Completion item kinds (`CompletionItemKind`), wire values 1–25.
pub mod completion_item_kind {
    pub const TEXT: u32 = 1 << 0;
    pub const METHOD: u32 = 1 << 1;
    pub const FUNCTION: u32 = 1 << 2;
    pub const CONSTRUCTOR: u32 = 1 << 3;
    pub const FIELD: u32 = 1 << 4;
    pub const VARIABLE: u32 = 1 << 5;
    pub const CLASS: u32 = 1 << 6;
    pub const INTERFACE: u32 = 1 << 7;
    pub const MODULE: u32 = 1 << 8;
    pub const PROPERTY: u32 = 1 << 9;
    pub const UNIT: u32 = 1 << 10;
    pub const VALUE: u32 = 1 << 11;
    pub const ENUM: u32 = 1 << 12;
    pub const KEYWORD: u32 = 1 << 13;
    pub const SNIPPET: u32 = 1 << 14;
    pub const COLOR: u32 = 1 << 15;
    pub const FILE: u32 = 1 << 16;
    pub const REFERENCE: u32 = 1 << 17;
    pub const FOLDER: u32 = 1 << 18;
    pub const ENUM_MEMBER: u32 = 1 << 19;
    pub const CONSTANT: u32 = 1 << 20;
    pub const STRUCT: u32 = 1 << 21;
    pub const EVENT: u32 = 1 << 22;
    pub const OPERATOR: u32 = 1 << 23;
    pub const TYPE_PARAMETER: u32 = 1 << 24;
    pub const ALL: u32 = (1 << 25) - 1;
}

const COMPLETION_ITEM_KIND_TABLE: &[(u32, i64)] = &[
    (completion_item_kind::TEXT, 1),
    (completion_item_kind::METHOD, 2),
    (completion_item_kind::FUNCTION, 3),
    (completion_item_kind::CONSTRUCTOR, 4),
    (completion_item_kind::FIELD, 5),
    (completion_item_kind::VARIABLE, 6),
    (completion_item_kind::CLASS, 7),
    (completion_item_kind::INTERFACE, 8),
    (completion_item_kind::MODULE, 9),
    (completion_item_kind::PROPERTY, 10),
    (completion_item_kind::UNIT, 11),
    (completion_item_kind::VALUE, 12),
    (completion_item_kind::ENUM, 13),
    (completion_item_kind::KEYWORD, 14),
    (completion_item_kind::SNIPPET, 15),
    (completion_item_kind::COLOR, 16),
    (completion_item_kind::FILE, 17),
    (completion_item_kind::REFERENCE, 18),
    (completion_item_kind::FOLDER, 19),
    (completion_item_kind::ENUM_MEMBER, 20),
    (completion_item_kind::CONSTANT, 21),
    (completion_item_kind::STRUCT, 22),
    (completion_item_kind::EVENT, 23),
    (completion_item_kind::OPERATOR, 24),
    (completion_item_kind::TYPE_PARAMETER, 25),
];

/// Code action kinds (`CodeActionKind`), hierarchical string tokens.
pub mod code_action_kind {
    pub const QUICK_FIX: u32 = 1 << 0;
    pub const REFACTOR: u32 = 1 << 1;
    pub const REFACTOR_EXTRACT: u32 = 1 << 2;
    pub const REFACTOR_INLINE: u32 = 1 << 3;
    pub const REFACTOR_REWRITE: u32 = 1 << 4;
    pub const SOURCE: u32 = 1 << 5;
    pub const SOURCE_ORGANIZE_IMPORTS: u32 = 1 << 6;
    pub const SOURCE_FIX_ALL: u32 = 1 << 7;
    pub const ALL: u32 = (1 << 8) - 1;
}

const CODE_ACTION_KIND_TABLE: &[(u32, &str)] = &[
    (code_action_kind::QUICK_FIX, "quickfix"),
    (code_action_kind::REFACTOR, "refactor"),
    (code_action_kind::REFACTOR_EXTRACT, "refactor.extract"),
    (code_action_kind::REFACTOR_INLINE, "refactor.inline"),
    (code_action_kind::REFACTOR_REWRITE, "refactor.rewrite"),
    (code_action_kind::SOURCE, "source"),
    (code_action_kind::SOURCE_ORGANIZE_IMPORTS, "source.organizeImports"),
    (code_action_kind::SOURCE_FIX_ALL, "source.fixAll"),
];

/// Diagnostic tags (`DiagnosticTag`), wire values 1–2.
pub mod diagnostic_tag {
    pub const UNNECESSARY: u32 = 1 << 0;
    pub const DEPRECATED: u32 = 1 << 1;
    pub const ALL: u32 = (1 << 2) - 1;
}

const DIAGNOSTIC_TAG_TABLE: &[(u32, i64)] = &[
    (diagnostic_tag::UNNECESSARY, 1),
    (diagnostic_tag::DEPRECATED, 2),
];

/// Markup kinds (`MarkupKind`).
pub mod markup_kind {
    pub const PLAINTEXT: u32 = 1 << 0;
    pub const MARKDOWN: u32 = 1 << 1;
    pub const ALL: u32 = (1 << 2) - 1;
}

const MARKUP_KIND_TABLE: &[(u32, &str)] = &[
    (markup_kind::PLAINTEXT, "plaintext"),
    (markup_kind::MARKDOWN, "markdown"),
];

/// Position encodings (`PositionEncodingKind`).
pub mod position_encoding {
    pub const UTF8: u32 = 1 << 0;
    pub const UTF16: u32 = 1 << 1;
    pub const UTF32: u32 = 1 << 2;
    pub const ALL: u32 = (1 << 3) - 1;
}

const POSITION_ENCODING_TABLE: &[(u32, &str)] = &[
    (position_encoding::UTF8, "utf-8"),
    (position_encoding::UTF16, "utf-16"),
    (position_encoding::UTF32, "utf-32"),
];

/// Workspace-edit resource operations (`ResourceOperationKind`).
pub mod resource_operation {
    pub const CREATE: u32 = 1 << 0;
    pub const RENAME: u32 = 1 << 1;
    pub const DELETE: u32 = 1 << 2;
    pub const ALL: u32 = (1 << 3) - 1;
}

const RESOURCE_OPERATION_TABLE: &[(u32, &str)] = &[
    (resource_operation::CREATE, "create"),
    (resource_operation::RENAME, "rename"),
    (resource_operation::DELETE, "delete"),
];

/// File-operation pattern kinds (`FileOperationPatternKind`).
pub mod file_operation_pattern {
    pub const FILE: u32 = 1 << 0;
    pub const FOLDER: u32 = 1 << 1;
    pub const ALL: u32 = (1 << 2) - 1;
}

const FILE_OPERATION_PATTERN_TABLE: &[(u32, &str)] = &[
    (file_operation_pattern::FILE, "file"),
    (file_operation_pattern::FOLDER, "folder"),
];

/// Per-feature dynamic-registration switches the client may declare.
pub mod dynamic_registration {
    pub const SYNCHRONIZATION: u32 = 1 << 0;
    pub const DOCUMENT_SYMBOL: u32 = 1 << 1;
    pub const COMPLETION: u32 = 1 << 2;
    pub const HOVER: u32 = 1 << 3;
    pub const CODE_ACTION: u32 = 1 << 4;
    pub const FILE_OPERATIONS: u32 = 1 << 5;
}

/// How the client wants a partially-failed workspace edit handled
/// (`FailureHandlingKind`). A single choice, not a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureHandling {
    Abort,
    Transactional,
    TextOnlyTransactional,
    Undo,
}

impl FailureHandling {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            FailureHandling::Abort => "abort",
            FailureHandling::Transactional => "transactional",
            FailureHandling::TextOnlyTransactional => "textOnlyTransactional",
            FailureHandling::Undo => "undo",
        }
    }
}

// =============================================================================
// Bitmask ⇄ token array helpers
// =============================================================================

fn int_flags_to_array(mask: u32, table: &[(u32, i64)]) -> JsonValue {
    let mut arr = JsonValue::array();
    for (bit, wire) in table {
        if mask & bit != 0 {
            arr.push(JsonValue::Int(*wire));
        }
    }
    arr
}

/// Symbol-kind flags rendered as a `valueSet` wire array.
pub fn symbol_flags_to_array(mask: u32) -> JsonValue {
    let mut arr = JsonValue::array();
    for (bit, wire, _) in SYMBOL_KIND_TABLE {
        if mask & bit != 0 {
            arr.push(JsonValue::Int(*wire));
        }
    }
    arr
}

/// OR the recognized symbol kinds of a `valueSet` array back into flags;
/// unknown values are skipped.
pub fn symbol_array_to_flags(value: &JsonValue) -> u32 {
    let mut mask = 0;
    for element in value.elements() {
        if let Some(n) = element.as_i64() {
            if let Some((bit, _, _)) = SYMBOL_KIND_TABLE.iter().find(|(_, wire, _)| *wire == n) {
                mask |= bit;
            }
        }
    }
    mask
}

fn str_flags_to_array(mask: u32, table: &[(u32, &'static str)]) -> JsonValue {
    let mut arr = JsonValue::array();
    for (bit, wire) in table {
        if mask & bit != 0 {
            arr.push(JsonValue::string(*wire));
        }
    }
    arr
}

/// OR recognized integer tokens back into flags; unknown values are skipped.
#[allow(dead_code)] // reverse direction of the integer tables; exercised in tests
fn int_array_to_flags(value: &JsonValue, table: &[(u32, i64)]) -> u32 {
    let mut mask = 0;
    for element in value.elements() {
        if let Some(n) = element.as_i64() {
            if let Some((bit, _)) = table.iter().find(|(_, wire)| *wire == n) {
                mask |= bit;
            }
        }
    }
    mask
}

/// OR recognized string tokens back into flags; unknown tokens are skipped.
fn str_array_to_flags(value: &JsonValue, table: &[(u32, &'static str)]) -> u32 {
    let mut mask = 0;
    for element in value.elements() {
        if let Some(s) = element.as_str() {
            if let Some((bit, _)) = table.iter().find(|(_, wire)| *wire == s) {
                mask |= bit;
            }
        }
    }
    mask
}

fn str_token_to_flag(token: &str, table: &[(u32, &'static str)]) -> u32 {
    table
        .iter()
        .find(|(_, wire)| *wire == token)
        .map(|(bit, _)| *bit)
        .unwrap_or(0)
}

// =============================================================================
// Client side: building the initialize capabilities
// =============================================================================

/// Feature flags the client declares during initialize.
///
/// The default advertises everything this engine actually handles; embedders
/// can narrow it before connecting. Dynamic registration defaults to off
/// because the engine does not answer `client/registerCapability`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCapabilities {
    pub dynamic_registration: u32,
    pub symbol_kinds: u32,
    pub hierarchical_document_symbol: bool,
    pub completion_item_kinds: u32,
    pub snippet_support: bool,
    pub code_action_kinds: u32,
    pub diagnostic_tags: u32,
    pub related_information: bool,
    pub diagnostic_version_support: bool,
    pub markup_kinds: u32,
    pub position_encodings: u32,
    pub resource_operations: u32,
    pub document_changes: bool,
    pub failure_handling: FailureHandling,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        ClientCapabilities {
            dynamic_registration: 0,
            symbol_kinds: symbol_kind::ALL,
            hierarchical_document_symbol: true,
            completion_item_kinds: completion_item_kind::ALL,
            snippet_support: false,
            code_action_kinds: code_action_kind::ALL,
            diagnostic_tags: diagnostic_tag::ALL,
            related_information: true,
            diagnostic_version_support: false,
            markup_kinds: markup_kind::ALL,
            position_encodings: position_encoding::UTF16,
            resource_operations: resource_operation::ALL,
            document_changes: true,
            failure_handling: FailureHandling::Transactional,
        }
    }
}

impl ClientCapabilities {
    fn declares_dynamic(&self, feature: u32) -> bool {
        self.dynamic_registration & feature != 0
    }
}

/// Assemble the `capabilities` member of the initialize request.
///
/// Pure flag-to-vocabulary translation; every array below comes from one of
/// the tables above so the spelling stays in one place.
pub fn build_client_capabilities(caps: &ClientCapabilities) -> JsonValue {
    let mut general = JsonValue::object();
    general.set(
        "positionEncodings",
        str_flags_to_array(caps.position_encodings, POSITION_ENCODING_TABLE),
    );

    let mut workspace_edit = JsonValue::object();
    workspace_edit.set("documentChanges", JsonValue::Bool(caps.document_changes));
    workspace_edit.set(
        "resourceOperations",
        str_flags_to_array(caps.resource_operations, RESOURCE_OPERATION_TABLE),
    );
    workspace_edit.set(
        "failureHandling",
        JsonValue::string(caps.failure_handling.as_wire_str()),
    );

    let mut file_operations = JsonValue::object();
    file_operations.set(
        "dynamicRegistration",
        JsonValue::Bool(caps.declares_dynamic(dynamic_registration::FILE_OPERATIONS)),
    );
    file_operations.set("didCreate", JsonValue::Bool(true));
    file_operations.set("didRename", JsonValue::Bool(true));
    file_operations.set("didDelete", JsonValue::Bool(true));

    let mut workspace = JsonValue::object();
    workspace.set("workspaceEdit", workspace_edit);
    workspace.set("fileOperations", file_operations);

    let mut synchronization = JsonValue::object();
    synchronization.set(
        "dynamicRegistration",
        JsonValue::Bool(caps.declares_dynamic(dynamic_registration::SYNCHRONIZATION)),
    );
    synchronization.set("didSave", JsonValue::Bool(true));

    let mut publish_diagnostics = JsonValue::object();
    publish_diagnostics.set(
        "relatedInformation",
        JsonValue::Bool(caps.related_information),
    );
    publish_diagnostics.set(
        "versionSupport",
        JsonValue::Bool(caps.diagnostic_version_support),
    );
    let mut tag_support = JsonValue::object();
    tag_support.set(
        "valueSet",
        int_flags_to_array(caps.diagnostic_tags, DIAGNOSTIC_TAG_TABLE),
    );
    publish_diagnostics.set("tagSupport", tag_support);

    let mut document_symbol = JsonValue::object();
    document_symbol.set(
        "dynamicRegistration",
        JsonValue::Bool(caps.declares_dynamic(dynamic_registration::DOCUMENT_SYMBOL)),
    );
    document_symbol.set(
        "hierarchicalDocumentSymbolSupport",
        JsonValue::Bool(caps.hierarchical_document_symbol),
    );
    let mut symbol_kind_support = JsonValue::object();
    symbol_kind_support.set("valueSet", symbol_flags_to_array(caps.symbol_kinds));
    document_symbol.set("symbolKind", symbol_kind_support);

    let mut completion_item = JsonValue::object();
    completion_item.set("snippetSupport", JsonValue::Bool(caps.snippet_support));
    completion_item.set(
        "documentationFormat",
        str_flags_to_array(caps.markup_kinds, MARKUP_KIND_TABLE),
    );
    let mut completion_item_kind_support = JsonValue::object();
    completion_item_kind_support.set(
        "valueSet",
        int_flags_to_array(caps.completion_item_kinds, COMPLETION_ITEM_KIND_TABLE),
    );
    let mut completion = JsonValue::object();
    completion.set(
        "dynamicRegistration",
        JsonValue::Bool(caps.declares_dynamic(dynamic_registration::COMPLETION)),
    );
    completion.set("completionItem", completion_item);
    completion.set("completionItemKind", completion_item_kind_support);

    let mut hover = JsonValue::object();
    hover.set(
        "dynamicRegistration",
        JsonValue::Bool(caps.declares_dynamic(dynamic_registration::HOVER)),
    );
    hover.set(
        "contentFormat",
        str_flags_to_array(caps.markup_kinds, MARKUP_KIND_TABLE),
    );

    let mut code_action_kind_support = JsonValue::object();
    code_action_kind_support.set(
        "valueSet",
        str_flags_to_array(caps.code_action_kinds, CODE_ACTION_KIND_TABLE),
    );
    let mut code_action_literal = JsonValue::object();
    code_action_literal.set("codeActionKind", code_action_kind_support);
    let mut code_action = JsonValue::object();
    code_action.set(
        "dynamicRegistration",
        JsonValue::Bool(caps.declares_dynamic(dynamic_registration::CODE_ACTION)),
    );
    code_action.set("codeActionLiteralSupport", code_action_literal);

    let mut text_document = JsonValue::object();
    text_document.set("synchronization", synchronization);
    text_document.set("publishDiagnostics", publish_diagnostics);
    text_document.set("documentSymbol", document_symbol);
    text_document.set("completion", completion);
    text_document.set("hover", hover);
    text_document.set("codeAction", code_action);

    let mut capabilities = JsonValue::object();
    capabilities.set("general", general);
    capabilities.set("workspace", workspace);
    capabilities.set("textDocument", text_document);
    capabilities
}

// =============================================================================
// Server side: parsing the initialize result
// =============================================================================

/// Document synchronization granularity a server asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncKind {
    #[default]
    None,
    Full,
    Incremental,
}

impl SyncKind {
    fn from_i64(value: i64) -> SyncKind {
        match value {
            1 => SyncKind::Full,
            2 => SyncKind::Incremental,
            _ => SyncKind::None,
        }
    }
}

/// One glob filter from a server's file-operation registration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileOperationFilter {
    pub scheme: Option<String>,
    pub glob: String,
    /// Pattern-kind bits; both set when the server does not narrow it.
    pub matches: u32,
}

/// File-operation filters a server registered statically at initialize.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileOperationCaps {
    pub did_create: Vec<FileOperationFilter>,
    pub did_rename: Vec<FileOperationFilter>,
    pub did_delete: Vec<FileOperationFilter>,
}

/// What the server declared it provides, decoded permissively.
///
/// Absent members default to false/empty. Servers vary widely in what they
/// advertise and a missing optional section must never abort the handshake.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerCapabilities {
    /// Single negotiated encoding flag; 0 when the server said nothing
    /// (the protocol default is then utf-16).
    pub position_encoding: u32,
    pub sync_kind: SyncKind,
    pub open_close: bool,
    pub document_symbol_provider: bool,
    pub hover_provider: bool,
    pub completion_provider: bool,
    pub completion_trigger_characters: Vec<String>,
    pub code_action_provider: bool,
    pub code_action_kinds: u32,
    pub file_operations: FileOperationCaps,
}

/// Decode `result.capabilities` from an initialize response.
pub fn parse_server_capabilities(value: &JsonValue) -> ServerCapabilities {
    let mut caps = ServerCapabilities::default();

    if let Some(encoding) = value.get("positionEncoding").and_then(JsonValue::as_str) {
        caps.position_encoding = str_token_to_flag(encoding, POSITION_ENCODING_TABLE);
    }

    // textDocumentSync arrives as either a bare number or an options object.
    if let Some(sync) = value.get("textDocumentSync") {
        match sync {
            JsonValue::Int(n) => {
                caps.sync_kind = SyncKind::from_i64(*n);
                caps.open_close = caps.sync_kind != SyncKind::None;
            }
            JsonValue::Object(_) => {
                caps.sync_kind = sync
                    .get("change")
                    .and_then(JsonValue::as_i64)
                    .map(SyncKind::from_i64)
                    .unwrap_or_default();
                caps.open_close = sync
                    .get("openClose")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false);
            }
            _ => {}
        }
    }

    // Provider members arrive as booleans or option objects; an object means
    // the feature is provided.
    caps.document_symbol_provider = provider_flag(value.get("documentSymbolProvider"));
    caps.hover_provider = provider_flag(value.get("hoverProvider"));

    if let Some(completion) = value.get("completionProvider") {
        caps.completion_provider = !completion.is_null();
        if let Some(triggers) = completion.get("triggerCharacters") {
            caps.completion_trigger_characters = triggers
                .elements()
                .iter()
                .filter_map(JsonValue::as_str)
                .map(unescape_text)
                .collect();
        }
    }

    if let Some(code_action) = value.get("codeActionProvider") {
        caps.code_action_provider = provider_flag(Some(code_action));
        if let Some(kinds) = code_action.get("codeActionKinds") {
            caps.code_action_kinds = str_array_to_flags(kinds, CODE_ACTION_KIND_TABLE);
        }
    }

    if let Some(file_ops) = value
        .get("workspace")
        .and_then(|w| w.get("fileOperations"))
    {
        caps.file_operations = FileOperationCaps {
            did_create: parse_filters(file_ops.get("didCreate")),
            did_rename: parse_filters(file_ops.get("didRename")),
            did_delete: parse_filters(file_ops.get("didDelete")),
        };
    }

    caps
}

fn provider_flag(value: Option<&JsonValue>) -> bool {
    match value {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::Object(_)) => true,
        _ => false,
    }
}

fn parse_filters(registration: Option<&JsonValue>) -> Vec<FileOperationFilter> {
    let Some(filters) = registration.and_then(|r| r.get("filters")) else {
        return Vec::new();
    };
    filters
        .elements()
        .iter()
        .map(|filter| {
            let pattern = filter.get("pattern");
            FileOperationFilter {
                scheme: filter
                    .get("scheme")
                    .and_then(JsonValue::as_str)
                    .map(unescape_text),
                glob: pattern
                    .and_then(|p| p.get("glob"))
                    .and_then(JsonValue::as_str)
                    .map(unescape_text)
                    .unwrap_or_default(),
                matches: pattern
                    .and_then(|p| p.get("matches"))
                    .and_then(JsonValue::as_str)
                    .map(|m| str_token_to_flag(m, FILE_OPERATION_PATTERN_TABLE))
                    .filter(|&m| m != 0)
                    .unwrap_or(file_operation_pattern::ALL),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symbol_kind_array_is_spelling_exact() {
        let caps = ClientCapabilities::default();
        let built = build_client_capabilities(&caps);
        let value_set = built
            .get("textDocument")
            .and_then(|t| t.get("documentSymbol"))
            .and_then(|d| d.get("symbolKind"))
            .and_then(|s| s.get("valueSet"))
            .expect("symbolKind.valueSet present");
        let values: Vec<i64> = value_set
            .elements()
            .iter()
            .filter_map(JsonValue::as_i64)
            .collect();
        assert_eq!(values, (1..=26).collect::<Vec<i64>>());
    }

    #[test]
    fn test_narrowed_flags_build_partial_arrays() {
        let caps = ClientCapabilities {
            symbol_kinds: symbol_kind::FUNCTION | symbol_kind::STRUCT,
            diagnostic_tags: diagnostic_tag::DEPRECATED,
            ..ClientCapabilities::default()
        };
        let built = build_client_capabilities(&caps);

        let kinds: Vec<i64> = built
            .get("textDocument")
            .and_then(|t| t.get("documentSymbol"))
            .and_then(|d| d.get("symbolKind"))
            .and_then(|s| s.get("valueSet"))
            .unwrap()
            .elements()
            .iter()
            .filter_map(JsonValue::as_i64)
            .collect();
        assert_eq!(kinds, vec![12, 23]);

        let tags: Vec<i64> = built
            .get("textDocument")
            .and_then(|t| t.get("publishDiagnostics"))
            .and_then(|p| p.get("tagSupport"))
            .and_then(|t| t.get("valueSet"))
            .unwrap()
            .elements()
            .iter()
            .filter_map(JsonValue::as_i64)
            .collect();
        assert_eq!(tags, vec![2]);
    }

    #[test]
    fn test_workspace_edit_tokens() {
        let built = build_client_capabilities(&ClientCapabilities::default());
        let edit = built
            .get("workspace")
            .and_then(|w| w.get("workspaceEdit"))
            .unwrap();
        let ops: Vec<&str> = edit
            .get("resourceOperations")
            .unwrap()
            .elements()
            .iter()
            .filter_map(JsonValue::as_str)
            .collect();
        assert_eq!(ops, vec!["create", "rename", "delete"]);
        assert_eq!(
            edit.get("failureHandling").and_then(JsonValue::as_str),
            Some("transactional")
        );
        assert_eq!(
            edit.get("documentChanges").and_then(JsonValue::as_bool),
            Some(true)
        );
    }

    #[test]
    fn test_position_encoding_tokens() {
        let caps = ClientCapabilities {
            position_encodings: position_encoding::UTF8 | position_encoding::UTF16,
            ..ClientCapabilities::default()
        };
        let built = build_client_capabilities(&caps);
        let encodings: Vec<&str> = built
            .get("general")
            .and_then(|g| g.get("positionEncodings"))
            .unwrap()
            .elements()
            .iter()
            .filter_map(JsonValue::as_str)
            .collect();
        assert_eq!(encodings, vec!["utf-8", "utf-16"]);
    }

    #[test]
    fn test_dynamic_registration_defaults_off() {
        let built = build_client_capabilities(&ClientCapabilities::default());
        let dynamic = built
            .get("textDocument")
            .and_then(|t| t.get("documentSymbol"))
            .and_then(|d| d.get("dynamicRegistration"))
            .and_then(JsonValue::as_bool);
        assert_eq!(dynamic, Some(false));
    }

    #[test]
    fn test_parse_empty_capabilities_defaults() {
        let caps = parse_server_capabilities(&parse("{}"));
        assert_eq!(caps, ServerCapabilities::default());
        assert_eq!(caps.sync_kind, SyncKind::None);
        assert!(!caps.document_symbol_provider);
    }

    #[test]
    fn test_parse_sync_number_form() {
        let caps = parse_server_capabilities(&parse(r#"{"textDocumentSync": 1}"#));
        assert_eq!(caps.sync_kind, SyncKind::Full);
        assert!(caps.open_close);
    }

    #[test]
    fn test_parse_sync_object_form() {
        let caps = parse_server_capabilities(&parse(
            r#"{"textDocumentSync": {"openClose": true, "change": 2}}"#,
        ));
        assert_eq!(caps.sync_kind, SyncKind::Incremental);
        assert!(caps.open_close);
    }

    #[test]
    fn test_parse_provider_boolean_and_object_forms() {
        let caps = parse_server_capabilities(&parse(r#"{"documentSymbolProvider": true}"#));
        assert!(caps.document_symbol_provider);

        let caps = parse_server_capabilities(&parse(
            r#"{"documentSymbolProvider": {"label": "outline"}}"#,
        ));
        assert!(caps.document_symbol_provider);

        let caps = parse_server_capabilities(&parse(r#"{"documentSymbolProvider": false}"#));
        assert!(!caps.document_symbol_provider);
    }

    #[test]
    fn test_parse_code_action_kinds_ignores_unknown() {
        let caps = parse_server_capabilities(&parse(
            r#"{"codeActionProvider": {"codeActionKinds": ["quickfix", "source.fixAll", "vendor.custom"]}}"#,
        ));
        assert!(caps.code_action_provider);
        assert_eq!(
            caps.code_action_kinds,
            code_action_kind::QUICK_FIX | code_action_kind::SOURCE_FIX_ALL
        );
    }

    #[test]
    fn test_parse_completion_triggers() {
        let caps = parse_server_capabilities(&parse(
            r#"{"completionProvider": {"triggerCharacters": [".", "::"]}}"#,
        ));
        assert!(caps.completion_provider);
        assert_eq!(caps.completion_trigger_characters, vec![".", "::"]);
    }

    #[test]
    fn test_parse_position_encoding_token() {
        let caps = parse_server_capabilities(&parse(r#"{"positionEncoding": "utf-8"}"#));
        assert_eq!(caps.position_encoding, position_encoding::UTF8);

        // Unknown encodings are ignored, leaving the protocol default.
        let caps = parse_server_capabilities(&parse(r#"{"positionEncoding": "utf-7"}"#));
        assert_eq!(caps.position_encoding, 0);
    }

    #[test]
    fn test_parse_file_operation_filters() {
        let caps = parse_server_capabilities(&parse(
            r#"{"workspace": {"fileOperations": {
                "didCreate": {"filters": [{"scheme": "file", "pattern": {"glob": "**/*.rs", "matches": "file"}}]},
                "didDelete": {"filters": [{"pattern": {"glob": "**/target"}}]}
            }}}"#,
        ));
        assert_eq!(caps.file_operations.did_create.len(), 1);
        let create = &caps.file_operations.did_create[0];
        assert_eq!(create.scheme.as_deref(), Some("file"));
        assert_eq!(create.glob, "**/*.rs");
        assert_eq!(create.matches, file_operation_pattern::FILE);

        // No matches member → both kinds.
        let delete = &caps.file_operations.did_delete[0];
        assert_eq!(delete.matches, file_operation_pattern::ALL);
        assert!(caps.file_operations.did_rename.is_empty());
    }

    #[test]
    fn test_flag_token_round_trip() {
        // flags → array → flags is the identity for every table.
        let mask = symbol_kind::CLASS | symbol_kind::METHOD | symbol_kind::TYPE_PARAMETER;
        let arr = symbol_flags_to_array(mask);
        assert_eq!(symbol_array_to_flags(&arr), mask);

        let mask = diagnostic_tag::UNNECESSARY | diagnostic_tag::DEPRECATED;
        let arr = int_flags_to_array(mask, DIAGNOSTIC_TAG_TABLE);
        assert_eq!(int_array_to_flags(&arr, DIAGNOSTIC_TAG_TABLE), mask);

        let mask = code_action_kind::REFACTOR_EXTRACT | code_action_kind::SOURCE;
        let arr = str_flags_to_array(mask, CODE_ACTION_KIND_TABLE);
        assert_eq!(str_array_to_flags(&arr, CODE_ACTION_KIND_TABLE), mask);
    }

    #[test]
    fn test_unrecognized_tokens_are_forward_compatible() {
        let arr = parse(r#"[1, 26, 99, -3]"#);
        assert_eq!(
            symbol_array_to_flags(&arr),
            symbol_kind::FILE | symbol_kind::TYPE_PARAMETER
        );
    }

    #[test]
    fn test_symbol_kind_names() {
        assert_eq!(symbol_kind_name(5), "Class");
        assert_eq!(symbol_kind_name(12), "Function");
        assert_eq!(symbol_kind_name(26), "TypeParameter");
        assert_eq!(symbol_kind_name(0), "Unknown");
        assert_eq!(symbol_kind_name(27), "Unknown");
    }
}
