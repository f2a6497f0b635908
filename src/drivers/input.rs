// Two-key input: KEY1 and KEY2, active low.
//
// Raw levels are debounced per pin, then ButtonEventHandler turns the
// stable levels into logical events once per loop tick:
//   short press  - released before long press, no second press in window
//   double press - second press inside the double-press window
//   long press   - held past the threshold, fires once per hold
//   combo press  - both keys down; swallows the keys' own events
//
// 50ms debounce, 400ms long press, 300ms double-press window.

use embedded_hal::digital::InputPin;
use log::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicEvent {
    #[default]
    None,
    ShortPress,
    LongPress,
    DoublePress,
    ComboPress,
}

/// Events of one tick. `combo` is `ComboPress` or `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyEvents {
    pub key1: LogicEvent,
    pub key2: LogicEvent,
    pub combo: LogicEvent,
}

impl KeyEvents {
    pub const NONE: Self = Self {
        key1: LogicEvent::None,
        key2: LogicEvent::None,
        combo: LogicEvent::None,
    };

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    pub debounce_ms: u32,
    pub long_press_ms: u32,
    pub double_press_ms: u32,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            long_press_ms: 400,
            double_press_ms: 300,
        }
    }
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Anything the reader loop can poll for one tick of events.
pub trait InputSource {
    fn poll(&mut self) -> KeyEvents;
}

#[derive(Debug, Clone, Copy, Default)]
struct KeyState {
    down: bool,
    press_at: u64,
    long_fired: bool,
    second_press: bool,
    // release time of a short press still waiting out the double window
    pending_since: Option<u64>,
}

impl KeyState {
    fn update(&mut self, down: bool, now: u64, timing: &ButtonTiming) -> LogicEvent {
        let mut event = LogicEvent::None;

        if down && !self.down {
            match self.pending_since.take() {
                Some(t) if now.saturating_sub(t) <= timing.double_press_ms as u64 => {
                    self.second_press = true;
                }
                _ => self.second_press = false,
            }
            self.press_at = now;
            self.long_fired = false;
        } else if down {
            let held = now.saturating_sub(self.press_at);
            if !self.long_fired && !self.second_press && held >= timing.long_press_ms as u64 {
                self.long_fired = true;
                event = LogicEvent::LongPress;
            }
        } else if self.down {
            if self.second_press {
                self.second_press = false;
                event = LogicEvent::DoublePress;
            } else if !self.long_fired {
                self.pending_since = Some(now);
            }
        } else if let Some(t) = self.pending_since {
            if now.saturating_sub(t) > timing.double_press_ms as u64 {
                self.pending_since = None;
                event = LogicEvent::ShortPress;
            }
        }

        self.down = down;
        event
    }

    // forget the current gesture; the key's release must not fire anything
    fn swallow(&mut self) {
        self.long_fired = true;
        self.second_press = false;
        self.pending_since = None;
    }
}

/// Gesture recogniser over two stable key levels.
pub struct ButtonEventHandler {
    timing: ButtonTiming,
    key1: KeyState,
    key2: KeyState,
    combo_active: bool,
}

impl ButtonEventHandler {
    pub fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            key1: KeyState::default(),
            key2: KeyState::default(),
            combo_active: false,
        }
    }

    pub fn timing(&self) -> ButtonTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: ButtonTiming) {
        self.timing = timing;
    }

    pub fn update(&mut self, key1_down: bool, key2_down: bool, now_ms: u64) -> KeyEvents {
        let mut events = KeyEvents::NONE;

        if key1_down && key2_down && !self.combo_active {
            self.combo_active = true;
            self.key1.swallow();
            self.key2.swallow();
            events.combo = LogicEvent::ComboPress;
            debug!("input: combo");
        }

        if self.combo_active {
            self.key1.down = key1_down;
            self.key2.down = key2_down;
            if !key1_down && !key2_down {
                self.combo_active = false;
            }
            return events;
        }

        events.key1 = self.key1.update(key1_down, now_ms, &self.timing);
        events.key2 = self.key2.update(key2_down, now_ms, &self.timing);
        if !events.is_none() {
            trace!("input: {:?}", events);
        }
        events
    }
}

struct Debounce {
    stable: bool,
    candidate: bool,
    candidate_since: u64,
}

impl Debounce {
    const fn new() -> Self {
        Self {
            stable: false,
            candidate: false,
            candidate_since: 0,
        }
    }

    fn feed(&mut self, raw: bool, now: u64, debounce_ms: u32) -> bool {
        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since = now;
        }
        if now.saturating_sub(self.candidate_since) >= debounce_ms as u64 {
            self.stable = self.candidate;
        }
        self.stable
    }
}

/// Two active-low GPIO keys with software debounce.
pub struct Buttons<K1, K2, C> {
    key1: K1,
    key2: K2,
    clock: C,
    deb1: Debounce,
    deb2: Debounce,
    handler: ButtonEventHandler,
}

impl<K1, K2, C> Buttons<K1, K2, C>
where
    K1: InputPin,
    K2: InputPin,
    C: Clock,
{
    pub fn new(key1: K1, key2: K2, clock: C, timing: ButtonTiming) -> Self {
        Self {
            key1,
            key2,
            clock,
            deb1: Debounce::new(),
            deb2: Debounce::new(),
            handler: ButtonEventHandler::new(timing),
        }
    }

    pub fn set_timing(&mut self, timing: ButtonTiming) {
        self.handler.set_timing(timing);
    }

    pub fn release(self) -> (K1, K2, C) {
        (self.key1, self.key2, self.clock)
    }
}

impl<K1, K2, C> InputSource for Buttons<K1, K2, C>
where
    K1: InputPin,
    K2: InputPin,
    C: Clock,
{
    fn poll(&mut self) -> KeyEvents {
        let now = self.clock.now_ms();
        let debounce = self.handler.timing().debounce_ms;
        // a pin read error reads as released
        let raw1 = self.key1.is_low().unwrap_or(false);
        let raw2 = self.key2.is_low().unwrap_or(false);
        let k1 = self.deb1.feed(raw1, now, debounce);
        let k2 = self.deb2.feed(raw2, now, debounce);
        self.handler.update(k1, k2, now)
    }
}
