use core::{cmp::min, future::pending};

use caps_word::{CapsWord, CapsWordKey};
use dual_action::DualActionTimer;
use embassy_futures::select::{select3, Either3};
use embassy_sync::{
    blocking_mutex::raw::{NoopRawMutex, RawMutex},
    channel::Channel,
    signal::Signal,
};
use embassy_time::{Instant, Timer};
use heapless::Deque;
use macros::Macro;
use splitmap_common::{
    globals,
    keycodes::{key_range, modifiers::LEFT_SHIFT},
};

use crate::{
    firmware_functions, layer, layout,
    scan_key::{ScanEvent, ScanEventChannel, ScanKey},
    shift_swap,
    tap_dance::TapDance,
};

mod caps_word;
pub(crate) mod dual_action;
pub mod macros;

#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimedScanKey(pub(crate) ScanKey, pub(crate) u64);
impl TimedScanKey {
    pub fn new(scan_key: ScanKey, time: u64) -> Self {
        Self(scan_key, time)
    }

    pub fn same_key(&self, scan_key: &TimedScanKey) -> bool {
        self.0.same_key(scan_key.0)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    fn none() -> Self {
        Self(ScanKey::none(), 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Oneshot {
    None,
    Held { mods: u8, used: bool },
    Ready(u8),
    Locked(u8),
}

/// Work deferred while a dual action is undecided.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Key(TimedScanKey),
    Action(u16, bool),
}

const PENDING_SIZE: usize = 32;

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Basic(u8, bool),
    /// Modifier change to merge into the next report.
    PendingModifiers(u8, bool),
    Modifiers(u8, bool),
    /// Consumer usage; `0` on release.
    Consumer(u16),
    Mouse(u8, bool),
    Lighting(u8, bool),
    Clear,
}
impl KeyEvent {
    fn consumer(kc: u16, is_down: bool) -> Self {
        let kc = kc - key_range::CONSUMER_MIN;
        Self::Consumer(if is_down { kc } else { 0 })
    }

    fn basic(kc8: u8, is_down: bool) -> Self {
        Self::Basic(kc8, is_down)
    }

    fn modifiers(modifiers: u8, is_down: bool, pending: bool) -> Self {
        if pending {
            Self::PendingModifiers(modifiers, is_down)
        } else {
            Self::Modifiers(modifiers, is_down)
        }
    }
}

/// What the display and split link need to know about the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardState {
    pub layer_state: u32,
    pub default_layer_state: u32,
    pub modifiers: u8,
    pub caps_word: bool,
}
impl KeyboardState {
    pub fn display_layer(&self) -> u8 {
        layer::resolve_display_layer(self.layer_state, self.default_layer_state)
    }
}

/// Asks [Mapper::run] to return.
#[derive(Default)]
pub struct ControlSignal(Signal<NoopRawMutex, ()>);
impl ControlSignal {
    pub fn exit(&self) {
        self.0.signal(());
    }
}

/// Reports from the mapper to the host framework, plus the latest [KeyboardState].
pub struct MapperChannel<M: RawMutex, const N: usize>(
    Channel<M, KeyEvent, N>,
    ControlSignal,
    Signal<NoopRawMutex, KeyboardState>,
);
impl<M: RawMutex, const N: usize> Default for MapperChannel<M, N> {
    fn default() -> Self {
        Self(Channel::new(), ControlSignal::default(), Signal::new())
    }
}
impl<M: RawMutex, const N: usize> MapperChannel<M, N> {
    pub async fn receive(&self) -> KeyEvent {
        self.0.receive().await
    }

    pub fn try_receive(&self) -> Option<KeyEvent> {
        self.0.try_receive().ok()
    }

    pub fn control(&self) -> &ControlSignal {
        &self.1
    }

    /// Wait for the keyboard state to change.
    pub async fn wait_state(&self) -> KeyboardState {
        self.2.wait().await
    }

    pub fn try_take_state(&self) -> Option<KeyboardState> {
        self.2.try_take()
    }

    fn report(&self, message: KeyEvent) {
        if self.0.try_send(message).is_err() {
            crate::warn!("report channel full; clearing");
            self.clear_reports();
            let _ = self.0.try_send(KeyEvent::Clear);
        }
    }

    fn clear_reports(&self) {
        self.0.clear();
    }
}

const MIN_REPORT_BUFFER_SIZE: usize = 4;

const fn assert_sizes<const LAYOUT_MAX: usize, const REPORT_BUFFER_SIZE: usize>() -> bool {
    assert!(REPORT_BUFFER_SIZE >= MIN_REPORT_BUFFER_SIZE);
    assert!(LAYOUT_MAX > 16);
    true
}

pub struct Mapper<
    'c,
    const ROW_COUNT: usize,
    const COL_COUNT: usize,
    const LAYOUT_MAX: usize,
    M: RawMutex,
    const REPORT_BUFFER_SIZE: usize,
> {
    layout: layout::Manager<ROW_COUNT, COL_COUNT, LAYOUT_MAX>,
    active_actions: [[u16; COL_COUNT]; ROW_COUNT],
    modifier_count: [i8; 8],
    report_channel: &'c MapperChannel<M, REPORT_BUFFER_SIZE>,
    wait_time: u64,
    oneshot: Oneshot,
    dual_action: DualActionTimer,
    tap_dance: TapDance,
    caps_word: CapsWord,
    last_scan_key: TimedScanKey,
    pending: Deque<Pending, PENDING_SIZE>,
    now: u64,
    pending_down_modifiers: u8,
    pending_up_modifiers: u8,
    published: Option<KeyboardState>,
}
impl<
        'c,
        const ROW_COUNT: usize,
        const COL_COUNT: usize,
        const LAYOUT_MAX: usize,
        M: RawMutex,
        const REPORT_BUFFER_SIZE: usize,
    > Mapper<'c, ROW_COUNT, COL_COUNT, LAYOUT_MAX, M, REPORT_BUFFER_SIZE>
{
    const OKAY: bool = assert_sizes::<LAYOUT_MAX, REPORT_BUFFER_SIZE>();
    pub fn new(report_channel: &'c MapperChannel<M, REPORT_BUFFER_SIZE>) -> Self {
        assert!(Self::OKAY);
        Self {
            layout: layout::Manager::default(),
            active_actions: [[0; COL_COUNT]; ROW_COUNT],
            modifier_count: Default::default(),
            report_channel,
            wait_time: u64::MAX,
            oneshot: Oneshot::None,
            dual_action: Default::default(),
            tap_dance: Default::default(),
            caps_word: Default::default(),
            last_scan_key: TimedScanKey::none(),
            pending: Deque::new(),
            now: 1,
            pending_down_modifiers: 0,
            pending_up_modifiers: 0,
            published: None,
        }
    }

    fn reset(&mut self) {
        self.active_actions = [[0; COL_COUNT]; ROW_COUNT];
        self.modifier_count = [0; 8];
        self.pending_down_modifiers = 0;
        self.pending_up_modifiers = 0;
        self.oneshot = Oneshot::None;
        self.dual_action = DualActionTimer::NoDual;
        self.pending.clear();
        self.tap_dance.clear();
        self.caps_word.stop();
        self.layout.clear_all();
        self.set_wait_time();
    }

    fn clear_all(&mut self) {
        self.reset();
        self.report_channel.clear_reports();
        self.report(KeyEvent::Clear);
    }

    fn clear_layers(&mut self) {
        let mods = self.modifiers();
        self.modifier_count = [0; 8];
        self.layout.clear_layers();
        if mods != 0 {
            self.report(KeyEvent::Modifiers(mods, false));
        }
    }

    /// Map scan events until [ControlSignal::exit]. Dual action, tap dance and caps word
    /// deadlines are waited on here too.
    pub async fn run<const SCANNER_BUFFER_SIZE: usize>(
        &mut self,
        scan_channel: &'c ScanEventChannel<M, SCANNER_BUFFER_SIZE>,
    ) {
        let control = self.report_channel.control();
        loop {
            self.publish_state();
            self.wait_for_report_capacity().await;
            if self.run_pending() {
                continue;
            }

            let wait_time = self.wait_time;
            let deadline = async move {
                match wait_time {
                    u64::MAX => pending().await,
                    t => Timer::at(Instant::from_millis(t)).await,
                }
            };
            let event = select3(scan_channel.receive(), deadline, control.0.wait()).await;

            self.now = Instant::now().as_millis();

            match event {
                Either3::First(ScanEvent::Key(scan_key)) => {
                    self.key_switch(TimedScanKey(scan_key, self.now))
                }
                Either3::First(ScanEvent::Encoder { index, clockwise }) => {
                    self.encoder_turn(index, clockwise)
                }
                Either3::Second(()) => self.check_time(),
                Either3::Third(()) => return,
            }
        }
    }

    /// Send the current [KeyboardState] to the display task when it has changed.
    pub fn publish_state(&mut self) {
        let state = self.state();
        if self.published != Some(state) {
            self.published = Some(state);
            self.report_channel.2.signal(state);
        }
    }

    pub fn state(&self) -> KeyboardState {
        KeyboardState {
            layer_state: self.layout.layer_state(),
            default_layer_state: self.layout.default_layer_state(),
            modifiers: self.modifiers(),
            caps_word: self.caps_word.is_active(),
        }
    }

    /// Modifier bits currently held.
    pub fn modifiers(&self) -> u8 {
        self.modifier_count
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .fold(0, |m, (i, _)| m | 1 << i)
    }

    pub fn layer_state(&self) -> u32 {
        self.layout.layer_state()
    }

    pub fn default_layer_state(&self) -> u32 {
        self.layout.default_layer_state()
    }

    fn dual_action_expired(&mut self) {
        self.dual_action.timer_expired();
        if let DualActionTimer::Hold { scan_key, .. } = &self.dual_action {
            self.key_switch(*scan_key);
        }
    }

    pub fn key_switch(&mut self, k: TimedScanKey) {
        self.now = self.now.max(k.1);
        if self.tap_dance.is_interrupted_by(k.0, k.1) {
            self.tap_dance_timeout();
        }

        self.last_scan_key = k;
        if self.dual_action.key_switch(k) {
            self.switch_key(k.0);
            return;
        }

        match self.dual_action {
            DualActionTimer::NoDual | DualActionTimer::Wait { .. } => {
                self.push_pending(Pending::Key(k));
            }
            DualActionTimer::Hold { scan_key, hold } => {
                if !scan_key.same_key(&k) {
                    self.push_pending(Pending::Key(k));
                }
                self.dual_action = DualActionTimer::NoDual;
                self.last_scan_key = scan_key;
                self.run_action(hold, true);
                self.flush_modifiers(false);
            }
            DualActionTimer::Tap { scan_key, tap } => {
                self.dual_action = DualActionTimer::NoDual;
                self.last_scan_key = scan_key;
                if self.push_pending(Pending::Action(tap, false)) {
                    self.run_action(tap, true);
                    self.flush_modifiers(false);
                }
            }
        }
        self.set_wait_time();
    }

    /// Run the action under `k`. The action is remembered on press so the release runs the
    /// same action whatever layers changed in between.
    fn switch_key(&mut self, k: ScanKey) {
        let (row, col) = (k.row(), k.column());
        if row >= ROW_COUNT || col >= COL_COUNT {
            crate::warn!("key out of range {}x{}", row, col);
            return;
        }
        let slot = &mut self.active_actions[row][col];
        if k.is_down() {
            let Some(kc) = self.layout.find_code(row, col) else {
                return;
            };
            *slot = kc;
            self.run_action(kc, true);
        } else {
            let kc = core::mem::take(slot);
            self.run_action(kc, false);
            self.use_oneshot(kc);
        }
        self.flush_modifiers(false);
    }

    /// Releasing any key other than a modifier, layer or dual action key uses up a one shot
    /// modifier.
    fn use_oneshot(&mut self, released: u16) {
        match released {
            key_range::MODIFIER_MIN..=key_range::MODIFIER_MAX
            | key_range::LAYER..=key_range::LAYERS_LAST => return,
            key_range::MACROS_MIN..=key_range::MACROS_MAX => {
                if let Macro::DualAction(..) =
                    self.layout.get_macro(released - key_range::MACROS_MIN)
                {
                    return;
                }
            }
            _ => {}
        }
        match self.oneshot {
            Oneshot::None | Oneshot::Locked(_) => {}
            Oneshot::Held { mods, .. } => self.oneshot = Oneshot::Held { mods, used: true },
            Oneshot::Ready(mods) => {
                self.oneshot = Oneshot::None;
                self.write_modifiers(mods, -1, true);
            }
        }
    }

    /// Tap the action assigned to one detent of encoder `index`.
    pub fn encoder_turn(&mut self, index: u8, clockwise: bool) {
        let Some((cw, ccw)) = self.layout.encoder(index as usize) else {
            crate::debug!("no encoder {}", index);
            return;
        };
        let action = if clockwise { cw } else { ccw };
        self.run_action(action, true);
        self.run_action(action, false);
        self.flush_modifiers(false);
    }

    fn flush_modifiers(&mut self, pending: bool) {
        let (up, down) = (self.pending_up_modifiers, self.pending_down_modifiers);
        if up | down == 0 {
            return;
        }
        self.pending_up_modifiers = 0;
        self.pending_down_modifiers = 0;
        // released and pressed again since the last flush: nothing to report
        let keep = !(up & down);
        let (up, down) = (up & keep, down & keep);
        if up != 0 {
            let report = KeyEvent::modifiers(up, false, pending || down != 0);
            self.report_channel.report(report);
        }
        if down != 0 {
            self.report_channel.report(KeyEvent::modifiers(down, true, pending));
        }
    }

    fn report(&mut self, message: KeyEvent) {
        self.flush_modifiers(true);
        self.report_channel.report(message);
    }

    fn run_action(&mut self, action: u16, is_down: bool) {
        use key_range::*;
        match action {
            MODIFIER_MIN..=MODIFIER_MAX => self.modifier(action, is_down),
            BASIC_MIN..=BASIC_MAX => self.basic(action, is_down),
            MACROS_MIN..=MACROS_MAX => self.macros(action, is_down),
            LAYER..=LAYERS_LAST => self.layer(action, is_down),
            FIRMWARE_MIN..=FIRMWARE_MAX => self.firmware_action(action, is_down),
            CONSUMER_MIN..=CONSUMER_MAX => self.report(KeyEvent::consumer(action, is_down)),
            MOUSE_MIN..=MOUSE_MAX => {
                self.report(KeyEvent::Mouse((action - MOUSE_MIN) as u8, is_down))
            }
            LIGHTING_MIN..=LIGHTING_MAX => {
                self.report(KeyEvent::Lighting((action - LIGHTING_MIN) as u8, is_down))
            }
            _ => {}
        }
    }

    fn basic(&mut self, code: u16, is_down: bool) {
        if is_down && self.caps_word.is_active() {
            match caps_word::classify(code) {
                CapsWordKey::Shifted => {
                    self.touch_caps_word();
                    self.write_modifiers(LEFT_SHIFT, 1, true);
                    self.report(KeyEvent::basic(code as u8, true));
                    self.write_modifiers(LEFT_SHIFT, -1, true);
                    return;
                }
                CapsWordKey::Continue => self.touch_caps_word(),
                CapsWordKey::Ends => {
                    self.caps_word.stop();
                    self.set_wait_time();
                }
            }
        }
        self.report(KeyEvent::basic(code as u8, is_down));
    }

    fn touch_caps_word(&mut self) {
        let timeout = self.layout.global(globals::CAPS_WORD_IDLE_TIMEOUT);
        self.caps_word.touch(self.now, timeout);
        self.set_wait_time();
    }

    fn firmware_action(&mut self, action: u16, is_down: bool) {
        use key_range::{
            FW_CAPS_WORD_TOGGLE, FW_CLEAR_ALL, FW_CLEAR_LAYERS, FW_RESET_TO_USB_BOOT,
        };
        match (action, is_down) {
            (FW_RESET_TO_USB_BOOT, false) => firmware_functions::reset_to_usb_boot(),
            (FW_CAPS_WORD_TOGGLE, true) if self.caps_word.is_active() => {
                self.caps_word.stop();
                self.set_wait_time();
            }
            (FW_CAPS_WORD_TOGGLE, true) => self.touch_caps_word(),
            (FW_CLEAR_ALL, true) => self.clear_all(),
            (FW_CLEAR_LAYERS, true) => self.clear_layers(),
            (FW_RESET_TO_USB_BOOT | FW_CAPS_WORD_TOGGLE | FW_CLEAR_ALL | FW_CLEAR_LAYERS, _) => {}
            _ => crate::info!("not yet supported: {:?}", action),
        }
    }

    pub fn load_layout(
        &mut self,
        layout_mapping: impl IntoIterator<Item = u16>,
    ) -> Result<(), layout::LoadError> {
        let result = self.layout.load(layout_mapping);
        self.reset();
        result
    }

    fn macros(&mut self, code: u16, is_down: bool) {
        let id = code - key_range::MACROS_MIN;
        match self.layout.get_macro(id) {
            Macro::Modifier { keycode, modifiers } => {
                if is_down {
                    self.write_modifiers(modifiers, 10, true);
                    self.run_action(keycode, is_down);
                } else {
                    self.run_action(keycode, is_down);
                    self.write_modifiers(modifiers, -10, true);
                }
            }
            Macro::DualAction(tap, hold, t1, t2) => {
                self.start_dual_action(is_down, tap, hold, t1, t2);
            }
            Macro::TapDance {
                timeout,
                location,
                len,
            } => {
                if is_down {
                    self.tap_dance(timeout, location, len);
                } else {
                    self.tap_dance.release(self.last_scan_key.0);
                }
            }
            Macro::ShiftSwap { primary, shifted } => {
                if is_down {
                    self.shift_swap(primary, shifted);
                }
            }
            Macro::Noop => {}
        }
    }

    fn shift_swap(&mut self, primary: u16, shifted: u16) {
        let mods = self.modifiers();
        let action = shift_swap::resolve(mods, primary, shifted);
        let held = shift_swap::held_shift(mods);
        let saved = self.modifier_count;
        for (i, c) in self.modifier_count.iter_mut().enumerate() {
            if held & (1 << i) != 0 {
                *c = 0;
            }
        }
        self.pending_up_modifiers |= held;
        self.run_action(action, true);
        self.run_action(action, false);
        self.modifier_count = saved;
        self.pending_down_modifiers |= held;
    }

    pub fn check_time(&mut self) {
        if self.wait_time <= self.now {
            if self.dual_action.wait_until() <= self.now {
                self.dual_action_expired();
            }
            if self.tap_dance.wait_until() <= self.now {
                self.tap_dance_timeout();
            }
            if self.caps_word.idle_until() <= self.now {
                crate::debug!("caps word idle");
                self.caps_word.stop();
            }
        }
        self.set_wait_time();
    }

    /// Advance the clock to `now` and act on any expired timers.
    pub fn tick(&mut self, now: u64) {
        self.now = self.now.max(now);
        self.check_time();
    }

    fn tap_dance(&mut self, timeout: u16, location: u32, len: u16) {
        let timeout = if timeout == u16::MAX {
            self.layout.global(globals::TAPDANCE_TAP_TIMEOUT)
        } else {
            timeout
        };
        let TimedScanKey(scan_key, time) = self.last_scan_key;
        self.tap_dance.press(scan_key, location, len, time, timeout);
        self.set_wait_time();
    }

    fn tap_dance_timeout(&mut self) {
        let Some(resolved) = self.tap_dance.finish() else {
            return;
        };
        self.set_wait_time();

        let action = self.layout.macro_code(resolved.location as usize);
        let k = resolved.key;
        if k.is_down() {
            if let Some(aa) = self
                .active_actions
                .get_mut(k.row())
                .and_then(|r| r.get_mut(k.column()))
            {
                *aa = action;
            }
            self.run_action(action, true);
        } else {
            self.run_action(action, true);
            self.run_action(action, false);
        }
        self.flush_modifiers(false);
    }

    fn modifier(&mut self, key: u16, is_down: bool) {
        let idx = key - key_range::MODIFIER_MIN;
        self.write_modifiers(1 << idx, if is_down { 1 } else { -1 }, false);
    }

    fn layer(&mut self, key: u16, is_down: bool) {
        let base = key_range::base_code(key);
        let n = key - base;
        match (base, is_down) {
            (key_range::LAYER, true) => {
                self.layout.activate_layer(n);
            }
            (key_range::LAYER, false) => {
                self.layout.deactivate_layer(n);
            }
            (key_range::TOGGLE, true) => self.layout.toggle_layer(n),
            (key_range::SET_LAYOUT, true) => self.layout.set_default_layer(n),
            (key_range::TOGGLE | key_range::SET_LAYOUT, false) => {}
            (key_range::ONESHOT, _) => self.oneshot(n as u8, is_down),
            _ => crate::warn!("unknown layer action: {}", key),
        }
    }

    /// A tap leaves `mods` held for the next key. Tapping the same one shot again while it
    /// waits locks `mods` on until the next tap of it.
    fn oneshot(&mut self, mods: u8, is_down: bool) {
        if !is_down {
            match self.oneshot {
                Oneshot::Held { mods, used: false } => self.oneshot = Oneshot::Ready(mods),
                Oneshot::Held { mods, used: true } => {
                    self.oneshot = Oneshot::None;
                    self.write_modifiers(mods, -1, false);
                }
                _ => {}
            }
            return;
        }
        match self.oneshot {
            Oneshot::Ready(prev) if prev == mods => {
                crate::debug!("one shot locked {}", mods);
                self.oneshot = Oneshot::Locked(mods);
                return;
            }
            Oneshot::Locked(prev) if prev == mods => {
                self.oneshot = Oneshot::None;
                self.write_modifiers(mods, -1, false);
                return;
            }
            Oneshot::Ready(prev) | Oneshot::Locked(prev) => self.write_modifiers(prev, -1, false),
            _ => {}
        }
        self.write_modifiers(mods, 1, false);
        self.oneshot = Oneshot::Held { mods, used: false };
    }

    /// Add `count` to the hold count of each modifier in `modifiers`. Only modifiers that change
    /// between held and released are reported; with `pending` the report is merged into the next
    /// report or [Self::flush_modifiers].
    fn write_modifiers(&mut self, modifiers: u8, count: i8, pending: bool) {
        let down = count > 0;
        let mut changed = 0u8;
        for (i, c) in self.modifier_count.iter_mut().enumerate() {
            let bit = 1 << i;
            if modifiers & bit != 0 {
                let was_held = *c > 0;
                *c = step_modifier_count(*c, count);
                if was_held != (*c > 0) {
                    changed |= bit;
                }
            }
        }
        match changed {
            0 => {}
            _ if pending && down => self.pending_down_modifiers |= changed,
            _ if pending => self.pending_up_modifiers |= changed,
            _ if changed.is_power_of_two() => {
                let code = key_range::MODIFIER_MIN as u8 + changed.trailing_zeros() as u8;
                self.report(KeyEvent::basic(code, down));
            }
            _ => self.report(KeyEvent::modifiers(changed, down, false)),
        }
    }

    fn set_wait_time(&mut self) {
        let t = min(
            min(self.dual_action.wait_until(), self.tap_dance.wait_until()),
            self.caps_word.idle_until(),
        );

        self.wait_time = t;
    }

    /// Give the host up to ten frames to drain the report channel.
    async fn wait_for_report_capacity(&self) {
        let channel = &self.report_channel.0;
        for _ in 0..10 {
            if channel.free_capacity() >= MIN_REPORT_BUFFER_SIZE {
                return;
            }
            Timer::after_millis(16).await;
        }
    }

    fn start_dual_action(&mut self, is_down: bool, tap: u16, hold: u16, time1: u16, time2: u16) {
        if !is_down {
            self.run_action(hold, false);
        } else {
            // an undecided dual action becomes a hold when another one starts
            if let DualActionTimer::Wait { hold, .. } = self.dual_action {
                self.run_action(hold, true);
                self.dual_action = DualActionTimer::NoDual;
            }
            let hold_after = match time1 {
                u16::MAX => self.layout.global(globals::DUAL_ACTION_TIMEOUT),
                t => t,
            };
            let window = match (time1, time2) {
                (u16::MAX, _) | (_, u16::MAX) => self.layout.global(globals::DUAL_ACTION_TIMEOUT2),
                (_, t) => t,
            };
            self.dual_action
                .start(self.last_scan_key, tap, hold, hold_after, window);
        }
        self.flush_modifiers(false);
        self.set_wait_time();
    }

    fn push_pending(&mut self, pending: Pending) -> bool {
        let queued = self.pending.push_back(pending).is_ok();
        if !queued {
            crate::warn!("too many pending keys; clearing");
            self.clear_all();
        }
        queued
    }

    /// Replay one deferred key or action. Returns false when there is nothing to run yet.
    pub fn run_pending(&mut self) -> bool {
        if !self.dual_action.is_no_timer() {
            return false;
        }
        match self.pending.pop_front() {
            Some(Pending::Key(k)) => self.key_switch(k),
            Some(Pending::Action(action, is_down)) => {
                self.run_action(action, is_down);
                if !is_down {
                    self.use_oneshot(action);
                }
                self.flush_modifiers(false);
            }
            None => return false,
        }
        true
    }
}

/// Held counts saturate; a count pinned at `i8::MAX` drops straight to released and one pinned
/// at `i8::MIN` restarts at `count`.
fn step_modifier_count(c: i8, count: i8) -> i8 {
    match (c, count > 0) {
        (i8::MAX, false) => i8::MIN,
        (i8::MIN, true) => count,
        _ => c.saturating_add(count),
    }
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod test;
