use std::{
    collections::{BTreeMap, HashMap},
    ops::Range,
    str::CharIndices,
};

use splitmap_common::{
    globals as common_globals,
    keycodes::{key_range, macro_types},
    MAX_LAYERS, PROTOCOL_VERSION,
};

use crate::{
    globals::{self, prop::GlobalProp},
    keycodes::{self, key_code},
    ConfigError,
};

type Result<T> = core::result::Result<T, ConfigError>;
type IndexChar = (usize, char);
type NameRange = Range<usize>;

/// Words before the globals in the binary layout.
pub const HEADER_LEN: usize = 6;
pub const MAX_ENCODERS: usize = splitmap_common::MAX_ENCODERS;

const TOO_MANY_RHS: &str = "Only one value may be assigned";
const TOO_MANY_MULTI_ALIAS_RHS: &str =
    "Only one value may be assigned to an multi-positioned alias";
const TOO_MANY_ROWS: &str = "Too many rows";
const TOO_MANY_COLS: &str = "Too many keys in row";
const UNKNOWN_ACTION: &str = "Unknown action/keycode";
const SYNTAX_ERROR: &str = "Syntax error";
const EOF: &str = "Unexpected end of file";

const RESERVED_SECTIONS: [&str; 7] = [
    "global", "matrix", "aliases", "firmware", "display", "encoders", "define",
];

/// Walks the source a character at a time. A `#` comment reads as the newline that ends it.
struct Cursor<'source> {
    chars: CharIndices<'source>,
    unread: Option<IndexChar>,
    current: IndexChar,
    len: usize,
}
impl<'source> Cursor<'source> {
    fn new(source: &'source str) -> Self {
        Self {
            chars: source.char_indices(),
            unread: None,
            current: (usize::MAX, '\0'),
            len: source.len(),
        }
    }

    /// Push back the character just read.
    fn unread(&mut self, item: IndexChar) {
        debug_assert!(self.unread.is_none() && item.0 == self.current.0);
        self.unread = Some(item);
    }

    fn advance(&mut self) -> Option<IndexChar> {
        let item = match self.unread.take().or_else(|| self.chars.next()) {
            Some((_, '#')) => self.chars.find(|&(_, c)| c == '\n'),
            item => item,
        };
        match item {
            Some(item) => self.current = item,
            None => self.current.0 = self.len,
        }
        item
    }

    fn seek(&mut self, mut pred: impl FnMut(char) -> bool) -> Option<IndexChar> {
        while let Some(item) = self.advance() {
            if pred(item.1) {
                return Some(item);
            }
        }
        None
    }

    /// Find `close` matching an `open` that has already been read.
    fn seek_close(&mut self, (open, close): (char, char)) -> Option<IndexChar> {
        let mut depth = 0usize;
        self.seek(|c| {
            if c == open {
                depth += 1;
            } else if c == close {
                if depth == 0 {
                    return true;
                }
                depth -= 1;
            }
            false
        })
    }
}

/// One `key = value` line of a section.
struct Entry {
    line: usize,
    key: NameRange,
    value: NameRange,
}

struct Parser<'source> {
    cursor: Cursor<'source>,
    config: KeyboardConfig<'source>,
    mark_idx: usize,
    /// Matrix positions whose name is also a key name.
    matrix_codes: Vec<(u16, u16)>,
}

fn invalid_seq_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')')
}

fn invalid_arg_char(c: char) -> bool {
    invalid_seq_char(c) || c == ','
}

fn invalid_section_char(c: char) -> bool {
    !matches!(c, '-' | '_' | '\\' | '.' | ':') && !c.is_alphanumeric()
}

pub struct KeyboardConfig<'source> {
    pub source: &'source str,
    pub global_map: HashMap<&'source str, GlobalProp>,
    pub firmware_map: HashMap<&'source str, &'source str>,
    pub matrix_map: HashMap<String, Vec<u16>>,
    define_map: HashMap<&'source str, u16>,
    encoders: BTreeMap<u8, (u16, u16)>,
    layers: HashMap<String, ConfigLayer>,
    macros_names: HashMap<Vec<u16>, u16>,
    macros: Vec<Macro>,
    next_layer: u16,
    pub row_count: u8,
    pub col_count: u8,
}

#[derive(Debug)]
pub struct ConfigLayer {
    codes: HashMap<u16, u16>,
    index: u16,
    display: Option<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Macro {
    Modifier { keycode: u16, modifiers: u8 },
    DualAction(u16, u16),
    TimedDualAction(u16, u16, u16, u16),
    /// A timeout of `u16::MAX` means use the global tap-dance timeout.
    TapDance { timeout: u16, choices: Vec<u16> },
    ShiftSwap { primary: u16, shifted: u16 },
}
impl Macro {
    fn serialize(&self) -> Vec<u16> {
        match self {
            Macro::Modifier { keycode, modifiers } => {
                vec![u16::from(*modifiers) << 8 | macro_types::MODIFIER, *keycode]
            }
            Macro::DualAction(tap, hold) => vec![macro_types::DUAL_ACTION, *tap, *hold],
            Macro::TimedDualAction(tap, hold, t1, u16::MAX) => {
                vec![macro_types::DUAL_ACTION, *tap, *hold, *t1]
            }
            Macro::TimedDualAction(tap, hold, t1, t2) => {
                vec![macro_types::DUAL_ACTION, *tap, *hold, *t1, *t2]
            }
            Macro::TapDance { timeout, choices } => [macro_types::TAPDANCE, *timeout]
                .into_iter()
                .chain(choices.iter().copied())
                .collect(),
            Macro::ShiftSwap { primary, shifted } => {
                vec![macro_types::SHIFT_SWAP, *primary, *shifted]
            }
        }
    }

    fn deserialize(data: &[u16]) -> Option<Self> {
        let (&head, rest) = data.split_first()?;
        let mac = match (head & 0xff, rest) {
            (macro_types::MODIFIER, [keycode, ..]) => Macro::Modifier {
                keycode: *keycode,
                modifiers: (head >> 8) as u8,
            },
            (macro_types::DUAL_ACTION, &[tap, hold]) => Macro::DualAction(tap, hold),
            (macro_types::DUAL_ACTION, &[tap, hold, t1]) => {
                Macro::TimedDualAction(tap, hold, t1, u16::MAX)
            }
            (macro_types::DUAL_ACTION, &[tap, hold, t1, t2]) => {
                Macro::TimedDualAction(tap, hold, t1, t2)
            }
            (macro_types::TAPDANCE, [timeout, choices @ ..]) if !choices.is_empty() => {
                Macro::TapDance {
                    timeout: *timeout,
                    choices: choices.to_vec(),
                }
            }
            (macro_types::SHIFT_SWAP, &[primary, shifted]) => Macro::ShiftSwap { primary, shifted },
            _ => return None,
        };
        Some(mac)
    }
}

const INVALID_LAYER_ACTION: &str = "Invalid layer(...) action";

impl<'source> Parser<'source> {
    fn new(source: &'source str) -> Self {
        Self {
            cursor: Cursor::new(source),
            config: KeyboardConfig::new(source),
            mark_idx: 0,
            matrix_codes: Vec::new(),
        }
    }

    fn parse_sections(&mut self) -> Result<()> {
        self.config.scan_layer_names()?;
        let source = self.config.source;
        while let Some((open, c)) = self.next_non_ws() {
            if c != '[' {
                return Err(error_span("expected '['", open..open + 1));
            }
            let (tag, suffix) = self.section_header(open)?;
            let tag = &source[tag];
            if tag != "matrix" && !suffix.is_empty() {
                return Err(error_span("suffix not allowed here", suffix));
            }
            match tag {
                "global" => self.parse_global()?,
                "matrix" => self.parse_matrix()?,
                "firmware" => self.parse_firmware()?,
                "aliases" => self.parse_aliases()?,
                "display" => self.parse_display()?,
                "encoders" => self.parse_encoders()?,
                "define" => self.parse_define()?,
                layer => self.parse_layer(layer)?,
            }
        }
        Ok(())
    }

    /// Read the rest of a header opened by the `[` at `open`. Returns the ranges of the name
    /// and of the suffix, which includes its leading `:` or `.`.
    fn section_header(&mut self, open: usize) -> Result<(NameRange, NameRange)> {
        self.mark_start();
        let missing = || error_span("missing ']'", open..open + 1);
        let tag_end = self
            .cursor
            .seek(|c| matches!(c, ']' | ':' | '.') || invalid_section_char(c))
            .ok_or_else(missing)?;
        let end = match tag_end.1 {
            ':' | '.' => self.cursor.seek(|c| c == ']' || invalid_section_char(c)),
            _ => Some(tag_end),
        };
        match end {
            Some((end, ']')) => Ok((open + 1..tag_end.0, tag_end.0..end)),
            _ => Err(missing()),
        }
    }

    /// The next line of the current section, or `None` at the next header or the end.
    fn next_entry(&mut self) -> Result<Option<Entry>> {
        let line = match self.peek_non_ws() {
            None | Some((_, '[')) => return Ok(None),
            Some((line, _)) => line,
        };
        let entry = self
            .parse_assignment()?
            .map(|(key, value)| Entry { line, key, value });
        Ok(entry)
    }

    fn parse_global(&mut self) -> Result<()> {
        while let Some(Entry { key, value, .. }) = self.next_entry()? {
            if self.name(&key) == "tri_layer" {
                self.assign_tri_layer(value)?;
            } else {
                self.assign_global(key, value)?;
                self.assert_no_more_values(TOO_MANY_RHS)?;
            }
        }
        Ok(())
    }

    fn assign_global(&mut self, key: NameRange, value: NameRange) -> Result<()> {
        let name = self.name(&key);
        let prop = GlobalProp::new_default(name).map_err(|e| error_span(e, key))?;
        let duration = self.config.parse_duration(&value, u16::MAX)?;
        let prop = prop.with_value(duration).map_err(|e| error_span(e, value))?;
        self.config.global_map.insert(name, prop);
        Ok(())
    }

    fn assign_tri_layer(&mut self, first: NameRange) -> Result<()> {
        let mut layers = [0u8; 3];
        let mut range = Some(first);
        for layer in layers.iter_mut() {
            let Some(r) = range.take() else {
                return Err(self.error("tri_layer needs two trigger layers and a result layer"));
            };
            *layer = self.get_layer_index(r)? as u8;
            range = self.next_assignment_value();
        }
        if range.is_some() {
            return Err(self.error(TOO_MANY_RHS));
        }
        let [a, b, result] = layers;
        let p = GlobalProp::new_default("tri_layer")
            .and_then(|p| p.with_value(common_globals::pack_tri_layer(a, b, result)))
            .map_err(|e| self.error(e))?;
        self.config.global_map.insert("tri_layer", p);
        Ok(())
    }

    /// Rows of `[matrix:RxC]` name the key positions. Names that are key names also fill the
    /// `main` layer of a keymap without layer sections.
    fn parse_matrix(&mut self) -> Result<()> {
        while let Some(Entry { line, key, value }) = self.next_entry()? {
            self.mark_idx = line;
            let pos = self
                .config
                .key_position(self.name(&key))
                .ok_or_else(|| self.error("Invalid key position"))?;
            self.for_each_in_row(pos, value, |p, pos, range| {
                let name = p.name(&range);
                p.config.assign_position_name(pos, name);
                if let Some(code) = key_code(name) {
                    p.matrix_codes.push((pos, code));
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn parse_aliases(&mut self) -> Result<()> {
        while let Some(Entry { key, value, .. }) = self.next_entry()? {
            let alias = self.name(&value);
            if !self.config.assign_aliases(self.name(&key), alias) {
                return Err(error_span("Unknown key name", key));
            }
            self.assert_no_more_values(TOO_MANY_RHS)?;
        }
        Ok(())
    }

    /// Firmware values are kept as text; they only have to tokenize.
    fn parse_firmware(&mut self) -> Result<()> {
        while let Some(Entry { key, value, .. }) = self.next_entry()? {
            let line = value.start..self.rest_of_line();
            let text = self.trim_value(line.clone());
            if text
                .replace('#', "//")
                .parse::<proc_macro2::TokenStream>()
                .is_err()
            {
                return Err(error_span(SYNTAX_ERROR, line));
            }
            let name = self.name(&key);
            self.config.firmware_map.insert(name, text);
        }
        Ok(())
    }

    fn parse_display(&mut self) -> Result<()> {
        while let Some(Entry { key, value, .. }) = self.next_entry()? {
            let eol = self.rest_of_line();
            let text = self.trim_value(value.start..eol);
            let name = self.name(&key);
            let layer = self
                .config
                .layers
                .get_mut(name)
                .ok_or_else(|| error_span(format!("Unknown layer name {name}"), key))?;
            layer.display = Some(text.to_string());
        }
        Ok(())
    }

    fn parse_encoders(&mut self) -> Result<()> {
        while let Some(Entry { key, value, .. }) = self.next_entry()? {
            let index = self
                .name(&key)
                .parse::<u8>()
                .ok()
                .filter(|i| usize::from(*i) < MAX_ENCODERS)
                .ok_or_else(|| error_span("Invalid encoder index", key))?;
            let clockwise = self.read_action(value)?;
            self.mark_start();
            let ccw = self
                .next_assignment_value()
                .ok_or_else(|| self.error("Expected counter-clockwise action"))?;
            let counter_clockwise = self.read_action(ccw)?;
            self.assert_no_more_values(TOO_MANY_RHS)?;
            self.config
                .encoders
                .insert(index, (clockwise, counter_clockwise));
        }
        Ok(())
    }

    fn parse_define(&mut self) -> Result<()> {
        while let Some(Entry { key, value, .. }) = self.next_entry()? {
            let name = self.name(&key);
            if key_code(name).is_some() || keycodes::action_code(name).is_some() {
                return Err(error_span(format!("'{name}' is already a key name"), key));
            }
            let code = self.read_action(value)?;
            self.assert_no_more_values(TOO_MANY_RHS)?;
            self.config.define_map.insert(name, code);
        }
        Ok(())
    }

    fn parse_layer(&mut self, layer: &str) -> Result<()> {
        while let Some(Entry { line, key, value }) = self.next_entry()? {
            self.mark_idx = line;
            let key_name = self.name(&key);
            match self.config.get_aliases(key_name).cloned() {
                Some(positions) if positions.len() != 1 => {
                    let code = self.read_action(value)?;
                    for pos in positions {
                        self.config.assign_one_layer_code(layer, pos, code);
                    }
                    self.assert_no_more_values(TOO_MANY_MULTI_ALIAS_RHS)?;
                }
                found => {
                    let pos = match found {
                        Some(positions) => positions[0],
                        None => self.config.key_position(key_name).ok_or_else(|| {
                            error_span(format!("key not found! {key_name}"), key)
                        })?,
                    };
                    self.for_each_in_row(pos, value, |p, pos, range| {
                        let code = p.read_action(range)?;
                        p.config.assign_one_layer_code(layer, pos, code);
                        Ok(())
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Call `each` with `first` and every further value on the line, at consecutive columns
    /// from `pos`.
    fn for_each_in_row(
        &mut self,
        mut pos: u16,
        first: NameRange,
        mut each: impl FnMut(&mut Self, u16, NameRange) -> Result<()>,
    ) -> Result<()> {
        if (pos >> 8) as u8 >= self.config.row_count {
            return Err(self.error(TOO_MANY_ROWS));
        }
        let mut value = Some(first);
        while let Some(range) = value {
            if (pos & 0xff) as u8 >= self.config.col_count {
                return Err(self.error(TOO_MANY_COLS));
            }
            each(self, pos, range)?;
            pos += 1;
            value = self.next_assignment_value();
        }
        Ok(())
    }

    fn assert_no_more_values(&mut self, msg: &str) -> Result<()> {
        self.mark_start();
        match self.next_assignment_value() {
            Some(_) => Err(self.error(msg)),
            None => Ok(()),
        }
    }

    fn read_action(&mut self, range: NameRange) -> Result<u16> {
        let name = self.name(&range);
        if let Some(code) = key_code(name) {
            return Ok(code);
        }
        let is_call = self.cursor.current == (range.end, '(');
        if !is_call {
            if let Some(&code) = self.config.define_map.get(name) {
                return Ok(code);
            }
        }
        let base = if is_call {
            keycodes::action_code(name)
        } else {
            keycodes::modifier_macro(name)
        };
        match base {
            Some(code @ (key_range::LAYER | key_range::TOGGLE | key_range::SET_LAYOUT)) => {
                self.cursor.advance();
                self.parse_layer_code(code)
            }
            Some(key_range::ONESHOT) => {
                self.cursor.advance();
                self.parse_oneshot()
            }
            Some(key_range::MACROS_MIN) => self.parse_macro(range),
            _ => Err(error_span(UNKNOWN_ACTION, range)),
        }
    }

    /// Read a macro argument, stopping before `,`, parentheses or whitespace. An empty range
    /// means there was none.
    fn read_arg(&mut self) -> NameRange {
        let Some((start, c)) = self.next_non_ws() else {
            let at = self.cursor.current.0;
            return at..at;
        };
        if invalid_arg_char(c) {
            self.cursor.unread((start, c));
            return start..start;
        }
        self.mark_start();
        match self.cursor.seek(invalid_arg_char) {
            Some(end) => {
                self.cursor.unread(end);
                start..end.0
            }
            None => start..self.cursor.current.0,
        }
    }

    fn read_timeout(&mut self) -> Result<u16> {
        let arg = self.read_arg();
        self.config.parse_duration(&arg, 5000)
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.mark_start();
        match self.next_non_ws() {
            Some((_, found)) if found == c => Ok(()),
            _ => Err(self.error(format!("Expected {c} "))),
        }
    }

    fn name(&self, range: &NameRange) -> &'source str {
        self.config.name(range)
    }

    /// Source text of `range` without a trailing comment.
    fn trim_value(&self, range: NameRange) -> &'source str {
        let value = &self.config.source[range];
        value.rsplit_once('#').map_or(value, |(v, _)| v).trim()
    }

    fn rest_of_line(&mut self) -> usize {
        self.cursor
            .seek(|c| c == '\n')
            .map_or(self.config.source.len(), |(i, _)| i)
    }

    /// The `, tap [, timeout [, timeout2]])` tail shared by `overload` and `dualaction`.
    fn dualaction(&mut self, hold: u16) -> Result<u16> {
        self.expect(',')?;
        let tap = self.read_arg();
        let tap = self.read_action(tap)?;

        let mut timeouts = [u16::MAX; 2];
        for timeout in timeouts.iter_mut() {
            match self.next_non_ws() {
                None => return Err(self.error(EOF)),
                Some((_, ')')) => break,
                Some(_) => *timeout = self.read_timeout()?,
            }
        }
        let mac = match timeouts {
            [u16::MAX, _] => Macro::DualAction(tap, hold),
            [t1, u16::MAX] => Macro::TimedDualAction(tap, hold, t1, u16::MAX),
            [t1, t2] => {
                self.expect(')')?;
                Macro::TimedDualAction(tap, hold, t1, t2)
            }
        };
        Ok(self.add_macro(mac))
    }

    fn tapdance(&mut self) -> Result<u16> {
        let mut timeout = u16::MAX;
        let mut choices = Vec::new();
        loop {
            let arg = self.read_arg();
            if arg.is_empty() {
                return Err(self.error("Missing tap dance choice"));
            }
            let name = self.name(&arg);
            match name.strip_suffix("ms") {
                Some(ms)
                    if choices.is_empty() && timeout == u16::MAX && ms.parse::<u16>().is_ok() =>
                {
                    timeout = self.config.parse_duration(&(arg.start..arg.start + ms.len()), 5000)?;
                }
                _ => choices.push(self.read_action(arg)?),
            }
            self.mark_start();
            match self.next_non_ws() {
                Some((_, ')')) => break,
                Some((_, ',')) => {}
                Some(_) => return Err(self.error("Expected , or )")),
                None => return Err(self.error(EOF)),
            }
        }
        if choices.is_empty() {
            return Err(self.error("Missing tap dance choice"));
        }
        Ok(self.add_macro(Macro::TapDance { timeout, choices }))
    }

    fn parse_macro(&mut self, range: NameRange) -> Result<u16> {
        let name = self.name(&range);
        let id = match name {
            "overload" | "dualaction" | "tapdance" | "shiftswap" => {
                // step over '('
                self.cursor.advance();
                self.macro_call(name)?
            }
            _ => self.modifier_chord(range)?,
        };
        if id > key_range::MACROS_MAX - key_range::MACROS_MIN {
            return Err(self.error("Too many macros"));
        }
        Ok(key_range::MACROS_MIN + id)
    }

    fn macro_call(&mut self, name: &str) -> Result<u16> {
        match name {
            "overload" => {
                let layer = self.read_arg();
                if layer.is_empty() {
                    return Err(self.error("Missing name"));
                }
                let hold = key_range::LAYER_MIN + self.get_layer_index(layer)?;
                self.dualaction(hold)
            }
            "dualaction" => {
                let hold = self.read_arg();
                let hold = self.read_action(hold)?;
                self.dualaction(hold)
            }
            "tapdance" => self.tapdance(),
            _ => {
                let primary = self.read_arg();
                let primary = self.read_action(primary)?;
                self.expect(',')?;
                let shifted = self.read_arg();
                let shifted = self.read_action(shifted)?;
                self.expect(')')?;
                Ok(self.add_macro(Macro::ShiftSwap { primary, shifted }))
            }
        }
    }

    /// A chord such as `C-S-tab`: modifiers, a dash, then a key name.
    fn modifier_chord(&mut self, range: NameRange) -> Result<u16> {
        let name = self.name(&range);
        let unknown = || error_span(UNKNOWN_ACTION, range.clone());
        let (mods, key) = name.rsplit_once('-').ok_or_else(unknown)?;
        let modifiers = keycodes::modifiers_to_bit_map(mods).ok_or_else(|| {
            error_span(
                format!("Invalid modifiers '{mods}'"),
                range.start..range.start + mods.len(),
            )
        })?;
        let keycode = key_code(key).ok_or_else(unknown)?;
        Ok(self.add_macro(Macro::Modifier { keycode, modifiers }))
    }

    fn parse_oneshot(&mut self) -> Result<u16> {
        let arg = self.read_arg();
        let name = self.name(&arg);
        let bits = match key_code(name) {
            Some(code @ key_range::MODIFIER_MIN..=key_range::MODIFIER_MAX) => {
                1u8 << (code - key_range::MODIFIER_MIN)
            }
            _ => keycodes::modifiers_to_bit_map(name)
                .filter(|b| *b != 0)
                .ok_or_else(|| error_span("Expected a modifier", arg.clone()))?,
        };
        self.expect(')')?;
        Ok(key_range::ONESHOT | bits as u16)
    }

    /// Identical macros share one id.
    fn add_macro(&mut self, mac: Macro) -> u16 {
        let next_id = self.config.macros.len() as u16;
        let id = *self
            .config
            .macros_names
            .entry(mac.serialize())
            .or_insert(next_id);
        if id == next_id {
            self.config.macros.push(mac);
        }
        id
    }

    fn get_layer_index(&self, range: NameRange) -> Result<u16> {
        let name = &self.config.source[range.clone()];
        self.config
            .get_layer_index(name)
            .ok_or_else(|| error_span(format!("Unknown layer name {name}"), range))
    }

    /// The `name)` tail of `layer(`, `toggle(` and `setlayout(`.
    fn parse_layer_code(&mut self, base_code: u16) -> Result<u16> {
        self.mark_start();
        let Some((start, _)) = self.next_non_ws() else {
            return Err(self.error(INVALID_LAYER_ACTION));
        };
        self.mark_idx = start;
        let end = match self.cursor.seek(|c| c == ')' || c.is_whitespace()) {
            Some((end, ')')) => Some(end),
            Some((end, _)) => self.next_non_ws().filter(|&(_, c)| c == ')').map(|_| end),
            None => None,
        };
        let Some(end) = end else {
            return Err(self.error(INVALID_LAYER_ACTION));
        };
        Ok(base_code + self.get_layer_index(start..end)?)
    }

    fn parse_assignment(&mut self) -> Result<Option<(NameRange, NameRange)>> {
        let Some(key) = self.read_word()? else {
            return Ok(None);
        };
        if !self.next_non_ws().is_some_and(|(_, c)| c == '=') {
            return Err(self.error("Missing ="));
        }
        let value = self
            .next_assignment_value()
            .ok_or_else(|| self.error("Missing RHS"))?;
        Ok(Some((key, value)))
    }

    /// The next value on the current line. A value starting with a bracket runs to its match.
    fn next_assignment_value(&mut self) -> Option<NameRange> {
        let (start, c) = self.cursor.seek(|c| c == '\n' || !c.is_whitespace())?;
        self.mark_start();
        if c == '\n' {
            return None;
        }
        let end = match match_paren(c) {
            Some(parens) => self.cursor.seek_close(parens),
            None => self
                .cursor
                .seek(invalid_seq_char)
                .inspect(|&end| self.cursor.unread(end)),
        };
        Some(start..end.map_or(self.cursor.current.0, |(e, _)| e))
    }

    fn mark_start(&mut self) {
        self.mark_idx = self.cursor.current.0;
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        let end = self.cursor.current.0.max(self.mark_idx);
        ConfigError::new(message.into(), self.mark_idx..end)
    }

    fn read_word(&mut self) -> Result<Option<NameRange>> {
        let Some((start, c)) = self.cursor.seek(|c| c == '\n' || !c.is_whitespace()) else {
            return Ok(None);
        };
        self.mark_start();
        if c == '\n' {
            return Ok(None);
        }
        let end = self
            .cursor
            .seek(char::is_whitespace)
            .ok_or_else(|| self.error("Expected word"))?;
        if end.1 == '\n' {
            self.cursor.unread(end);
        }
        Ok(Some(start..end.0))
    }

    /// A keymap without layer sections gets a `main` layer from the matrix names.
    fn build_config(mut self) -> KeyboardConfig<'source> {
        if self.config.layers.is_empty() {
            self.config.new_layer("main");
            for (pos, code) in self.matrix_codes {
                self.config.assign_one_layer_code("main", pos, code);
            }
        }
        self.config
    }

    fn peek_non_ws(&mut self) -> Option<IndexChar> {
        let item = self.next_non_ws()?;
        self.cursor.unread(item);
        Some(item)
    }

    fn next_non_ws(&mut self) -> Option<IndexChar> {
        self.cursor.seek(|c| !c.is_whitespace())
    }
}

fn match_paren(start: char) -> Option<(char, char)> {
    Some(match start {
        '(' => ('(', ')'),
        '[' => ('[', ']'),
        '{' => ('{', '}'),
        _ => return None,
    })
}

fn data_to_usize(x: u16) -> usize {
    u16::from_le(x) as usize
}

fn corrupt(message: &str) -> ConfigError {
    ConfigError::from(message)
}

impl<'source> KeyboardConfig<'source> {
    fn new(source: &'source str) -> Self {
        Self {
            source,
            global_map: Default::default(),
            firmware_map: Default::default(),
            matrix_map: Default::default(),
            define_map: Default::default(),
            encoders: Default::default(),
            layers: Default::default(),
            macros_names: Default::default(),
            macros: Default::default(),
            next_layer: 0,
            row_count: 0,
            col_count: 0,
        }
    }

    /// Rebuild a config from its binary layout. Layers are named `layer0`, `layer1`...
    pub fn deserialize(data: &[u16]) -> Result<KeyboardConfig<'static>> {
        let truncated = || corrupt("Layout truncated");
        let words = data.iter().map(|w| data_to_usize(*w)).collect::<Vec<_>>();
        match words.first() {
            None => return Err(truncated()),
            Some(&v) if v != PROTOCOL_VERSION as usize => {
                return Err(corrupt("Layout version mismatch"))
            }
            Some(_) => {}
        }
        let Some(&[_, rc, layer_count, macros_count, encoder_count, globals_len]) =
            words.get(..HEADER_LEN)
        else {
            return Err(truncated());
        };

        let mut config = KeyboardConfig::new("");
        config.row_count = (rc >> 8) as u8;
        config.col_count = rc as u8;

        let encoders_start = HEADER_LEN + globals_len;
        let dir_start = encoders_start + encoder_count * 2;
        let section_count = layer_count + macros_count;
        if words.len() < dir_start + section_count + 1 {
            return Err(truncated());
        }

        config.deserialize_globals(data[HEADER_LEN..encoders_start].iter().copied());
        for (i, pair) in words[encoders_start..dir_start].chunks_exact(2).enumerate() {
            if pair != [0, 0] {
                config
                    .encoders
                    .insert(i as u8, (pair[0] as u16, pair[1] as u16));
            }
        }

        let dir = &words[dir_start..];
        let base = &data[dir_start..];
        let section = |i: usize| {
            base.get(dir[i]..dir[i + 1])
                .ok_or_else(|| corrupt("Invalid offset"))
        };
        for i in 0..layer_count {
            let mut layer = ConfigLayer::new(i as u16);
            layer.set_binary(
                section(i)?,
                config.row_count as usize,
                config.col_count as usize,
            );
            config.layers.insert(format!("layer{i}"), layer);
        }
        config.next_layer = layer_count as u16;

        for i in 0..macros_count {
            let mac = Macro::deserialize(section(layer_count + i)?)
                .ok_or_else(|| corrupt("Invalid macro"))?;
            config.macros_names.insert(mac.serialize(), i as u16);
            config.macros.push(mac);
        }

        Ok(config)
    }

    /// The binary layout: header, globals, encoders, then a directory of section offsets
    /// (relative to the directory) followed by the layer and macro sections.
    pub fn serialize(&self) -> Vec<u16> {
        let globals = self.serialize_globals();
        let encoders = self.serialize_encoders();
        let (rows, cols) = (self.row_count as usize, self.col_count as usize);
        let sections = self
            .sorted_layers()
            .into_iter()
            .map(|(_, layer)| layer.serialize(rows, cols))
            .chain(self.macros.iter().map(Macro::serialize))
            .collect::<Vec<_>>();

        let header: [u16; HEADER_LEN] = [
            PROTOCOL_VERSION,
            (self.row_count as u16) << 8 | self.col_count as u16,
            self.layers.len() as u16,
            self.macros.len() as u16,
            (encoders.len() / 2) as u16,
            globals.len() as u16,
        ];
        let mut out = header.map(u16::to_le).to_vec();
        out.extend(globals);
        out.extend(encoders);

        let mut offset = sections.len() + 1;
        for section in sections.iter() {
            out.push((offset as u16).to_le());
            offset += section.len();
        }
        out.push((offset as u16).to_le());
        out.extend(sections.into_iter().flatten());
        out
    }

    pub fn deserialize_globals(&mut self, data: impl Iterator<Item = u16>) {
        let mut data = data.map(u16::from_le);
        while let Some(gp) = GlobalProp::deserialize(&mut data) {
            if let Some(name) = gp.default_name() {
                self.global_map.insert(name, gp);
            }
        }
    }

    pub fn serialize_globals(&self) -> Vec<u16> {
        let mut out = self.global_map.values().collect::<Vec<_>>();
        out.sort_by(|a, b| Ord::cmp(&a.index, &b.index));
        out.into_iter()
            .flat_map(|v| v.serialize())
            .map(u16::to_le)
            .collect()
    }

    fn serialize_encoders(&self) -> Vec<u16> {
        let Some(max) = self.encoders.keys().next_back() else {
            return Vec::new();
        };
        let mut out = vec![0; (*max as usize + 1) * 2];
        for (i, (cw, ccw)) in self.encoders.iter() {
            out[*i as usize * 2] = cw.to_le();
            out[*i as usize * 2 + 1] = ccw.to_le();
        }
        out
    }

    fn sorted_layers(&self) -> Vec<(&String, &ConfigLayer)> {
        let mut layers = self.layers.iter().collect::<Vec<_>>();
        layers.sort_by_key(|(_, l)| l.index);
        layers
    }

    /// Source text of `range`; a leading `\` escapes a name that would otherwise be special.
    fn name(&self, range: &NameRange) -> &'source str {
        let text = &self.source[range.clone()];
        match text.strip_prefix('\\') {
            Some(rest) if !rest.is_empty() => rest,
            _ => text,
        }
    }

    fn parse_duration(&self, range: &NameRange, max: u16) -> Result<u16> {
        match self.name(range).parse::<u16>() {
            Ok(ms) if ms <= max => Ok(ms),
            _ => Err(error_span(
                format!("Invalid duration; only 0 to {max} milliseconds are valid"),
                range.clone(),
            )),
        }
    }

    /// `0xRC` is row R column C (one hex digit each); `0xRCC` and `0xRRCC` give the row in the
    /// high byte.
    pub fn key_position(&self, name: &str) -> Option<u16> {
        let hex = name.strip_prefix("0x")?;
        let pos = u16::from_str_radix(hex, 16).ok()?;
        match hex.len() {
            2 => Some((pos & 0xf0) << 4 | pos & 0xf),
            3 | 4 => Some(pos),
            _ => None,
        }
    }

    pub fn global(&self, name: &str) -> Option<GlobalProp> {
        self.global_map
            .get(name)
            .copied()
            .or_else(|| globals::DEFAULTS.get(name).copied())
    }

    /// The tri-layer rule as `(trigger_a, trigger_b, result)` layer indexes.
    pub fn tri_layer(&self) -> Option<(u8, u8, u8)> {
        self.global_map
            .get("tri_layer")
            .and_then(|g| common_globals::unpack_tri_layer(g.value()))
    }

    /// Give `value` the positions named by `key`, either a position or an existing name.
    fn assign_aliases(&mut self, key: &str, value: &str) -> bool {
        let positions = match self.key_position(key) {
            Some(pos) => vec![pos],
            None => match self.get_aliases(key) {
                Some(positions) => positions.clone(),
                None => return false,
            },
        };
        self.matrix_map
            .entry(alias_key(value))
            .or_default()
            .extend(positions);
        true
    }

    fn assign_position_name(&mut self, pos: u16, name: &str) {
        self.matrix_map.entry(alias_key(name)).or_default().push(pos);
    }

    pub fn get_aliases(&self, name: &str) -> Option<&Vec<u16>> {
        self.matrix_map.get(&alias_key(name))
    }

    pub fn code_at(&self, name: &str, rowcol: u16) -> u16 {
        self.layers.get(name).map_or(0, |l| l.code_at(rowcol))
    }

    pub fn macro_at(&self, code: u16) -> Option<&Macro> {
        if (key_range::MACROS_MIN..=key_range::MACROS_MAX).contains(&code) {
            self.macros.get((code - key_range::MACROS_MIN) as usize)
        } else {
            None
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn macro_count(&self) -> usize {
        self.macros.len()
    }

    /// Section names of the layers in index order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.sorted_layers()
            .into_iter()
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Display names of the layers in index order; a layer without one uses its section name.
    pub fn display_names(&self) -> Vec<String> {
        self.sorted_layers()
            .into_iter()
            .map(|(n, l)| l.display.clone().unwrap_or_else(|| n.clone()))
            .collect()
    }

    pub fn encoders(&self) -> Vec<(u8, u16, u16)> {
        self.encoders
            .iter()
            .map(|(i, (cw, ccw))| (*i, *cw, *ccw))
            .collect()
    }

    pub fn defined(&self, name: &str) -> Option<u16> {
        self.define_map.get(name).copied()
    }

    fn assign_one_layer_code(&mut self, name: &str, pos: u16, code: u16) {
        if let Some(layer) = self.layers.get_mut(name) {
            layer.set_code(pos, code);
        }
    }

    fn new_layer(&mut self, name: &str) {
        self.layers
            .insert(name.into(), ConfigLayer::new(self.next_layer));

        self.next_layer += 1;
    }

    pub fn get_layer_index(&self, name: &str) -> Option<u16> {
        self.layers.get(name).map(|l| l.index)
    }

    /// Register every section header up front so layers are numbered in file order and can be
    /// referred to before their section appears.
    fn scan_layer_names(&mut self) -> Result<()> {
        let mut depth = 0usize;
        let mut parens = ('(', ')');
        let mut escaped = false;
        let mut in_comment = false;
        let mut line_start = true;
        // start of the header name and the position of its ':' if any
        let mut header: Option<(usize, Option<usize>)> = None;

        for (i, c) in self.source.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if c == '\n' && depth == 0 {
                line_start = true;
                in_comment = false;
                header = None;
                continue;
            }
            if in_comment {
                continue;
            }
            match c {
                '#' => in_comment = true,
                '\\' => escaped = true,
                _ if depth > 0 => {
                    if c == parens.0 {
                        depth += 1;
                    } else if c == parens.1 {
                        depth -= 1;
                    }
                }
                _ => {
                    if let Some((start, colon)) = header {
                        match c {
                            ':' if colon.is_none() => header = Some((start, Some(i))),
                            ']' => {
                                self.ensure_section(start, colon.unwrap_or(start), i)?;
                                header = None;
                            }
                            _ => {}
                        }
                    } else if line_start && !c.is_whitespace() {
                        line_start = false;
                        if c == '[' {
                            header = Some((i + 1, None));
                        } else if let Some(p) = match_paren(c) {
                            parens = p;
                            depth = 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn ensure_section(&mut self, s: usize, e: usize, i: usize) -> Result<()> {
        let (name, suffix) = if s == e {
            (&self.source[s..i], &self.source[s..e])
        } else {
            (&self.source[s..e], &self.source[e + 1..i])
        };

        match name {
            "matrix" => {
                let size = suffix.split_once('x').and_then(|(rows, cols)| {
                    Some((rows.parse::<u8>().ok()?, cols.parse::<u8>().ok()?))
                });
                let Some((rows, cols)) = size else {
                    return Err(ConfigError::new(
                        "expected [matrix:rxc] where r and c are row column size".into(),
                        s..i,
                    ));
                };
                self.row_count = rows;
                self.col_count = cols;
            }
            _ if RESERVED_SECTIONS.contains(&name) => {}
            _ => {
                if !suffix.is_empty() {
                    return Err(ConfigError::new(
                        "layer sections take no suffix".into(),
                        e + 1..i,
                    ));
                }
                if !self.layers.contains_key(name) {
                    if self.layers.len() >= MAX_LAYERS {
                        return Err(ConfigError::new(
                            format!("Too many layers; at most {} are allowed", MAX_LAYERS),
                            s..i,
                        ));
                    }
                    self.new_layer(name);
                }
            }
        }

        Ok(())
    }

    /// `[firmware]` value of `arg`, trying its upper case spelling second.
    pub fn firmware_get(&self, arg: &str) -> Option<&str> {
        let map = &self.firmware_map;
        map.get(arg)
            .or_else(|| map.get(arg.to_uppercase().as_str()))
            .copied()
    }
}

impl ConfigLayer {
    fn new(index: u16) -> Self {
        Self {
            codes: Default::default(),
            index,
            display: None,
        }
    }

    /// Load a layer section; a section of exactly `row_count * col_count` words is dense.
    fn set_binary(&mut self, data: &[u16], row_count: usize, col_count: usize) {
        let words = data.iter().map(|w| u16::from_le(*w)).collect::<Vec<_>>();
        if words.len() == row_count * col_count {
            let set = words
                .iter()
                .enumerate()
                .filter(|(_, code)| **code != key_range::TRANSPARENT)
                .map(|(i, code)| (((i / col_count) << 8 | i % col_count) as u16, *code));
            self.codes.extend(set);
        } else {
            self.codes
                .extend(words.chunks_exact(2).map(|pair| (pair[0], pair[1])));
        }
    }

    /// Dense when more than a third of the matrix is set, otherwise `(position, code)` pairs
    /// sorted by position.
    fn serialize(&self, row_count: usize, col_count: usize) -> Vec<u16> {
        let size = row_count * col_count;
        if self.codes.len() * 3 > size {
            let mut dense = vec![0; size];
            for (&pos, &code) in &self.codes {
                dense[(pos >> 8) as usize * col_count + (pos & 0xff) as usize] = code.to_le();
            }
            dense
        } else {
            let mut pairs = self.codes.iter().map(|(&p, &c)| (p, c)).collect::<Vec<_>>();
            pairs.sort_unstable();
            pairs
                .into_iter()
                .flat_map(|(p, c)| [p.to_le(), c.to_le()])
                .collect()
        }
    }

    pub fn code_at(&self, pos: u16) -> u16 {
        self.codes.get(&pos).copied().unwrap_or(0)
    }

    fn set_code(&mut self, pos: u16, code: u16) {
        self.codes.insert(pos, code);
    }
}

/// Every spelling of a key name maps to the same alias entry.
fn alias_key(name: &str) -> String {
    match key_code(name) {
        Some(code) => format!("{code:04X}"),
        None => name.to_owned(),
    }
}

fn error_span(message: impl Into<String>, range: NameRange) -> ConfigError {
    ConfigError::new(message.into(), range)
}

pub fn compile(source: &str) -> Result<KeyboardConfig> {
    let mut parser = Parser::new(source);

    parser.parse_sections()?;
    Ok(parser.build_config())
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod test;
