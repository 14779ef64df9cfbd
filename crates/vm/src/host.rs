//! Host collaborators: rendering and platform services.
//!
//! Natives are the only code that talks to these traits. The headless
//! implementations record what they are asked to do into a shared log so a
//! caller can inspect it after handing the boxed host to a session.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// One drawing request.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    CirclePrecision(u32),
    Circle {
        x: f64,
        y: f64,
        radius: f64,
        outline: bool,
    },
    Rectangle {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        outline: bool,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
    },
    Sprite {
        sprite: i64,
        subimage: i64,
        x: f64,
        y: f64,
    },
}

pub trait Renderer {
    fn begin_frame(&mut self) {}
    fn end_frame(&mut self) {}
    fn set_circle_precision(&mut self, precision: u32);
    fn draw_circle(&mut self, x: f64, y: f64, radius: f64, outline: bool);
    fn draw_rectangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, outline: bool);
    fn draw_text(&mut self, x: f64, y: f64, text: &str);
    fn draw_sprite(&mut self, sprite: i64, subimage: i64, x: f64, y: f64);
}

/// Renderer that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Rc<RefCell<Vec<DrawCall>>>,
    frames: Rc<RefCell<usize>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the call log.
    pub fn calls(&self) -> Rc<RefCell<Vec<DrawCall>>> {
        Rc::clone(&self.calls)
    }

    /// Shared handle to the number of completed frames.
    pub fn frames(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.frames)
    }

    fn record(&self, call: DrawCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn end_frame(&mut self) {
        *self.frames.borrow_mut() += 1;
    }

    fn set_circle_precision(&mut self, precision: u32) {
        self.record(DrawCall::CirclePrecision(precision));
    }

    fn draw_circle(&mut self, x: f64, y: f64, radius: f64, outline: bool) {
        self.record(DrawCall::Circle {
            x,
            y,
            radius,
            outline,
        });
    }

    fn draw_rectangle(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, outline: bool) {
        self.record(DrawCall::Rectangle {
            x1,
            y1,
            x2,
            y2,
            outline,
        });
    }

    fn draw_text(&mut self, x: f64, y: f64, text: &str) {
        self.record(DrawCall::Text {
            x,
            y,
            text: text.to_string(),
        });
    }

    fn draw_sprite(&mut self, sprite: i64, subimage: i64, x: f64, y: f64) {
        self.record(DrawCall::Sprite {
            sprite,
            subimage,
            x,
            y,
        });
    }
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Show(String),
    Debug(String),
}

/// Input and message services.
pub trait Platform {
    /// Key currently held.
    fn key_down(&self, key: i64) -> bool;
    /// Key went down this frame.
    fn key_pressed(&self, key: i64) -> bool;
    /// Key went up this frame.
    fn key_released(&self, key: i64) -> bool;
    fn show_message(&mut self, text: &str);
    fn debug_message(&mut self, text: &str);
    /// Called after every frame; edge-triggered input resets here.
    fn end_frame(&mut self) {}
}

/// Keyboard state for a headless platform.
#[derive(Debug, Clone, Default)]
pub struct Keys {
    pub held: HashSet<i64>,
    pub pressed: HashSet<i64>,
    pub released: HashSet<i64>,
}

impl Keys {
    /// Presses `key` for the next frame.
    pub fn press(&mut self, key: i64) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: i64) {
        if self.held.remove(&key) {
            self.released.insert(key);
        }
    }
}

/// Platform without a window. Input is scripted through [`Keys`]; messages
/// are recorded.
#[derive(Debug, Clone, Default)]
pub struct HeadlessPlatform {
    keys: Rc<RefCell<Keys>>,
    messages: Rc<RefCell<Vec<Message>>>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Rc<RefCell<Keys>> {
        Rc::clone(&self.keys)
    }

    pub fn messages(&self) -> Rc<RefCell<Vec<Message>>> {
        Rc::clone(&self.messages)
    }
}

impl Platform for HeadlessPlatform {
    fn key_down(&self, key: i64) -> bool {
        self.keys.borrow().held.contains(&key)
    }

    fn key_pressed(&self, key: i64) -> bool {
        self.keys.borrow().pressed.contains(&key)
    }

    fn key_released(&self, key: i64) -> bool {
        self.keys.borrow().released.contains(&key)
    }

    fn show_message(&mut self, text: &str) {
        self.messages.borrow_mut().push(Message::Show(text.to_string()));
    }

    fn debug_message(&mut self, text: &str) {
        self.messages.borrow_mut().push(Message::Debug(text.to_string()));
    }

    fn end_frame(&mut self) {
        let mut keys = self.keys.borrow_mut();
        keys.pressed.clear();
        keys.released.clear();
    }
}
