use core::cmp::Ordering;

use splitmap_common::{
    globals,
    keycodes::key_range::{MACROS_MAX, MACROS_MIN},
    MAX_ENCODERS, MAX_LAYERS, PROTOCOL_VERSION,
};

use crate::{layer, layer_bit, mapper::macros::Macro};

pub struct Manager<const ROWS: usize, const COLS: usize, const LAYOUT_MAX: usize> {
    mapping: [u16; LAYOUT_MAX],
    globals: [u16; globals::GLOBALS_LEN],
    encoders: [[u16; 2]; MAX_ENCODERS],
    encoder_count: usize,
    layer_count: usize,
    macros_count: usize,
    macro_dir_base: usize,
    layer_state: u32,
    default_layer_state: u32,
    tri_layer: Option<(u8, u8, u8)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    OutOfSpace,
    VersionMismatch,
    RowColMismatch,
    Corrupt,
}

#[derive(Debug)]
pub struct Layer<'l, const ROWS: usize, const COLS: usize>(&'l [u16]);

impl<const ROWS: usize, const COLS: usize> Layer<'_, ROWS, COLS> {
    pub fn get(&self, row: usize, column: usize) -> u16 {
        if self.0.len() == ROWS * COLS {
            if row >= ROWS || column >= COLS {
                return 0;
            }
            *self.0.get(row * COLS + column).unwrap_or(&0u16)
        } else {
            search_code(self.0, row, column)
        }
    }
}

impl<const ROWS: usize, const COLS: usize, const LAYOUT_MAX: usize> Default
    for Manager<ROWS, COLS, LAYOUT_MAX>
{
    fn default() -> Self {
        Self {
            mapping: [0; LAYOUT_MAX],
            globals: globals::DEFAULTS,
            encoders: [[0; 2]; MAX_ENCODERS],
            encoder_count: 0,
            layer_count: 0,
            macros_count: 0,
            macro_dir_base: 0,
            layer_state: 0,
            default_layer_state: 1,
            tri_layer: None,
        }
    }
}

impl<const ROWS: usize, const COLS: usize, const LAYOUT_MAX: usize>
    Manager<ROWS, COLS, LAYOUT_MAX>
{
    /// Load a compiled layout into `Manager`. The format of the layout is as follows:
    ///
    /// protocol version
    /// row_count (high byte), column_count (low byte) should match `ROWS` and `COLS`
    /// layer count, macro count, encoder count, globals length
    /// globals as (index, value) pairs
    /// encoders as (clockwise, counter-clockwise) pairs
    /// layer and macro positions followed by the end position, then the layers and macros.
    ///
    /// Positions are relative to the first position word. Layers are dense if every entry has a
    /// value; size == ROWS * COLS. Layers are sparse if size < ROWS * COLS in which case it is a
    /// list of ordered pairs where the first word is row (high byte) and column (low byte) and the
    /// second word is the code.
    pub fn load(&mut self, iter: impl IntoIterator<Item = u16>) -> Result<(), LoadError> {
        let result = self.load_mapping(iter);
        if result.is_err() {
            *self = Self::default();
        }
        result
    }

    fn load_mapping(&mut self, iter: impl IntoIterator<Item = u16>) -> Result<(), LoadError> {
        let mut iter = iter.into_iter().map(u16::from_le);
        let mut next = || iter.next().ok_or(LoadError::Corrupt);

        if next()? != PROTOCOL_VERSION {
            return Err(LoadError::VersionMismatch);
        }
        {
            let n = next()?;

            if (n >> 8) as usize != ROWS || (n & 0xff) as usize != COLS {
                return Err(LoadError::RowColMismatch);
            }
        }

        let layer_count = next()? as usize;
        let macros_count = next()? as usize;
        let encoder_count = next()? as usize;
        let mut globals_len = next()?;

        if layer_count == 0
            || layer_count > MAX_LAYERS
            || macros_count > (MACROS_MAX - MACROS_MIN) as usize
            || encoder_count > MAX_ENCODERS
        {
            crate::warn!(
                "corrupt layout: layer_count {}, macros_count {} or encoder_count {} is out-of-range",
                layer_count,
                macros_count,
                encoder_count
            );
            return Err(LoadError::Corrupt);
        }

        self.globals = globals::DEFAULTS;
        while globals_len != 0 {
            if globals_len < 2 {
                crate::warn!("corrupt layout: globals length is wrong");
                return Err(LoadError::Corrupt);
            }
            let i = next()?;
            let v = next()?;
            *self
                .globals
                .get_mut(i as usize)
                .ok_or(LoadError::Corrupt)? = v;
            globals_len -= 2;
        }

        self.encoders = [[0; 2]; MAX_ENCODERS];
        for e in self.encoders.iter_mut().take(encoder_count) {
            *e = [next()?, next()?];
        }

        let dir_len = layer_count + macros_count + 1;
        let mut i = 0;
        let mut p = 0;
        for n in iter {
            let Some(t) = self.mapping.get_mut(i) else {
                crate::warn!("layout too big: LAYOUT_MAX is {}", LAYOUT_MAX);
                return Err(LoadError::OutOfSpace);
            };
            if i < dir_len {
                if (n as usize) < dir_len || n < p {
                    crate::warn!("corrupt layout: layer/macro {} position is invalid", i);
                    return Err(LoadError::Corrupt);
                }
                p = n;
            }
            *t = n;
            i += 1;
        }

        if i < dir_len || p as usize != i {
            crate::warn!("corrupt layout: truncated at {}", i);
            return Err(LoadError::Corrupt);
        }

        self.layer_count = layer_count;
        self.macros_count = macros_count;
        self.macro_dir_base = layer_count;
        self.encoder_count = encoder_count;
        self.tri_layer = globals::unpack_tri_layer(self.globals[globals::TRI_LAYER as usize])
            .filter(|(a, b, r)| {
                [*a, *b, *r]
                    .iter()
                    .all(|l| (*l as usize) < self.layer_count)
            });

        self.clear_all();

        Ok(())
    }

    pub(crate) fn clear_all(&mut self) {
        self.default_layer_state = 1;
        self.clear_layers();
    }

    pub(crate) fn clear_layers(&mut self) {
        self.layer_state = 0;
    }

    /// The code for `row`, `column` from the highest active layer that is not transparent there.
    pub fn find_code(&self, row: usize, column: usize) -> Option<u16> {
        let mut state = self.layer_state | self.default_layer_state;
        while state != 0 {
            let idx = 31 - state.leading_zeros();
            state &= !(1 << idx);
            if let Some(layer) = self.get_layer(idx as u16) {
                let code = layer.get(row, column);
                if code != 0 {
                    return Some(code);
                }
            }
        }
        None
    }

    pub fn get_macro(&self, id: u16) -> Macro {
        let idx = id as usize + self.macro_dir_base;
        if id as usize >= self.macros_count {
            return Macro::Noop;
        }

        let s = self.mapping[idx] as usize;
        let e = self.mapping[idx + 1] as usize;
        if e < s || e > self.mapping.len() {
            return Macro::Noop;
        }

        Macro::decode(s, self.mapping.get(s..e))
    }

    pub fn get_layer(&self, layer_num: u16) -> Option<Layer<'_, ROWS, COLS>> {
        let idx = layer_num as usize;
        if idx >= self.layer_count {
            return None;
        }

        let s = self.mapping[idx] as usize;
        let e = self.mapping[idx + 1] as usize;
        if e < s || e > self.mapping.len() {
            crate::warn!("corrupt layout: layer address out of range {}..{}", s, e);
            return None;
        }

        self.mapping.get(s..e).map(Layer)
    }

    pub(crate) fn macro_code(&self, location: usize) -> u16 {
        self.mapping.get(location).copied().unwrap_or(0)
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn layer_state(&self) -> u32 {
        self.layer_state
    }

    pub fn default_layer_state(&self) -> u32 {
        self.default_layer_state
    }

    pub fn is_layer_active(&self, n: u16) -> bool {
        self.layer_state & layer_bit(n) != 0
    }

    pub fn activate_layer(&mut self, n: u16) -> bool {
        if n as usize >= self.layer_count {
            return false;
        }
        self.layer_state |= layer_bit(n);
        self.apply_tri_layer();
        true
    }

    pub fn deactivate_layer(&mut self, n: u16) -> bool {
        let was_active = self.is_layer_active(n);
        self.layer_state &= !layer_bit(n);
        self.apply_tri_layer();
        was_active
    }

    pub fn toggle_layer(&mut self, n: u16) {
        if !self.deactivate_layer(n) {
            self.activate_layer(n);
        }
    }

    pub fn set_default_layer(&mut self, n: u16) {
        if (n as usize) < self.layer_count {
            self.default_layer_state = layer_bit(n);
        }
    }

    fn apply_tri_layer(&mut self) {
        if let Some((a, b, result)) = self.tri_layer {
            self.layer_state = layer::update_tri_layer_state(self.layer_state, a, b, result);
        }
    }

    pub fn tri_layer(&self) -> Option<(u8, u8, u8)> {
        self.tri_layer
    }

    pub(crate) fn global(&self, index: u16) -> u16 {
        self.globals[index as usize]
    }

    /// The (clockwise, counter-clockwise) actions for encoder `index`.
    pub fn encoder(&self, index: usize) -> Option<(u16, u16)> {
        if index < self.encoder_count {
            let [cw, ccw] = self.encoders[index];
            Some((cw, ccw))
        } else {
            None
        }
    }
}

/// Sparse layers are `(position, code)` pairs sorted by position.
fn search_code(pairs: &[u16], row: usize, column: usize) -> u16 {
    let key = ((row as u16) << 8) | column as u16;
    let (mut lo, mut hi) = (0, pairs.len() / 2);
    while lo < hi {
        let mid = (lo + hi) / 2;
        match pairs[mid * 2].cmp(&key) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return pairs[mid * 2 + 1],
        }
    }
    0
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod test;
