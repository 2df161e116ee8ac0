//! Test doubles for the runtime ABI.
//!
//! [`ScriptedRuntime`] stands in for the compiled runtime: a real arena
//! allocator with leak accounting, a scriptable interpret entry point and a
//! flip transform over a small character table. It exists so the marshaling
//! and boundary layers can be tested across crate boundaries without the
//! actual artifact.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::abi::{OutputSink, RawPtr, RuntimeAbi};
use crate::error::{AbiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Records everything emitted through it, in emission order.
#[derive(Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<(Stream, String)>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(Stream, String)> {
        lock(&self.lines).clone()
    }
}

impl OutputSink for CollectingSink {
    fn stdout(&self, text: &str) {
        lock(&self.lines).push((Stream::Stdout, text.to_owned()));
    }

    fn stderr(&self, text: &str) {
        lock(&self.lines).push((Stream::Stderr, text.to_owned()));
    }
}

/// What the interpret entry point should do once the source buffer has been
/// consumed.
pub enum OnInterpret {
    /// Emit these lines through the sink, then return success.
    Emit(Vec<(Stream, String)>),
    /// Emit these lines, then return this nonzero status. Models a program
    /// that prints before crashing.
    EmitThenFail(Vec<(Stream, String)>, i32),
    /// Return this nonzero status.
    Fail(i32),
    /// Park until the paired sender fires, then return success. Models a
    /// long-running user program.
    Block(Mutex<mpsc::Receiver<()>>),
}

/// What the flip entry point should produce.
pub enum OnFlip {
    /// Flip through the character table.
    Table,
    /// Fail after consuming the source buffer.
    Fail,
    /// Return exactly these bytes, whatever the input.
    Raw(Vec<u8>),
}

struct Arena {
    next: usize,
    buffers: HashMap<usize, Vec<u8>>,
}

impl Arena {
    fn new() -> Self {
        Self {
            // Arbitrary nonzero base so no live buffer is ever at NULL.
            next: 0x1000,
            buffers: HashMap::new(),
        }
    }

    fn alloc(&mut self, len: usize) -> RawPtr {
        let ptr = self.next;
        self.next += len.max(1);
        self.buffers.insert(ptr, vec![0; len]);
        RawPtr(ptr)
    }

    fn free(&mut self, ptr: RawPtr, len: usize) -> Result<Vec<u8>> {
        match self.buffers.remove(&ptr.0) {
            Some(buf) if buf.len() == len => Ok(buf),
            Some(buf) => {
                // Length mismatch is as much a bug as a stray pointer.
                self.buffers.insert(ptr.0, buf);
                Err(AbiError::BadPointer { ptr, len })
            }
            None => Err(AbiError::BadPointer { ptr, len }),
        }
    }
}

pub struct ScriptedRuntime {
    arena: Mutex<Arena>,
    sink: Mutex<Option<Arc<dyn OutputSink>>>,
    on_interpret: OnInterpret,
    on_flip: OnFlip,
    interpreted: Mutex<Vec<(String, bool)>>,
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self {
            arena: Mutex::new(Arena::new()),
            sink: Mutex::new(None),
            on_interpret: OnInterpret::Emit(Vec::new()),
            on_flip: OnFlip::Table,
            interpreted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sink(self, sink: Arc<dyn OutputSink>) -> Self {
        self.set_sink(sink);
        self
    }

    /// Install the sink after construction, the shape a runtime factory
    /// needs when the sink only exists once the execution context is up.
    pub fn set_sink(&self, sink: Arc<dyn OutputSink>) {
        *lock(&self.sink) = Some(sink);
    }

    pub fn on_interpret(mut self, behavior: OnInterpret) -> Self {
        self.on_interpret = behavior;
        self
    }

    pub fn on_flip(mut self, behavior: OnFlip) -> Self {
        self.on_flip = behavior;
        self
    }

    /// Number of buffers currently allocated and not yet released. Zero
    /// after a well-behaved call, whatever its outcome.
    pub fn live_allocations(&self) -> usize {
        lock(&self.arena).buffers.len()
    }

    /// The programs interpret has been handed, with their orientation flags.
    pub fn interpreted(&self) -> Vec<(String, bool)> {
        lock(&self.interpreted).clone()
    }

    fn emit(&self, stream: Stream, text: &str) {
        if let Some(sink) = lock(&self.sink).clone() {
            match stream {
                Stream::Stdout => sink.stdout(text),
                Stream::Stderr => sink.stderr(text),
            }
        }
    }

    /// Consume a NUL-terminated source buffer, returning its text.
    fn consume_source(&self, ptr: RawPtr) -> Result<String> {
        let mut arena = lock(&self.arena);
        let len = arena
            .buffers
            .get(&ptr.0)
            .map(Vec::len)
            .ok_or(AbiError::BadPointer { ptr, len: 0 })?;
        let mut bytes = arena.free(ptr, len)?;
        if bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl RuntimeAbi for ScriptedRuntime {
    fn alloc(&self, len: usize) -> Result<RawPtr> {
        Ok(lock(&self.arena).alloc(len))
    }

    fn dealloc(&self, ptr: RawPtr, len: usize) -> Result<()> {
        lock(&self.arena).free(ptr, len).map(|_| ())
    }

    fn write_bytes(&self, ptr: RawPtr, bytes: &[u8]) -> Result<()> {
        let mut arena = lock(&self.arena);
        let buf = arena
            .buffers
            .get_mut(&ptr.0)
            .filter(|buf| bytes.len() <= buf.len())
            .ok_or(AbiError::BadPointer {
                ptr,
                len: bytes.len(),
            })?;
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn read_bytes(&self, ptr: RawPtr, len: usize) -> Result<Vec<u8>> {
        let arena = lock(&self.arena);
        let buf = arena
            .buffers
            .get(&ptr.0)
            .filter(|buf| len <= buf.len())
            .ok_or(AbiError::BadPointer { ptr, len })?;
        Ok(buf[..len].to_vec())
    }

    fn interpret(&self, source: RawPtr, upside_down: bool) -> Result<()> {
        let text = self.consume_source(source)?;
        lock(&self.interpreted).push((text, upside_down));

        match &self.on_interpret {
            OnInterpret::Emit(lines) => {
                for (stream, text) in lines {
                    self.emit(*stream, text);
                }
                Ok(())
            }
            OnInterpret::EmitThenFail(lines, status) => {
                for (stream, text) in lines {
                    self.emit(*stream, text);
                }
                Err(AbiError::Interpret { status: *status })
            }
            OnInterpret::Fail(status) => Err(AbiError::Interpret { status: *status }),
            OnInterpret::Block(release) => {
                let _ = lock(release).recv();
                Ok(())
            }
        }
    }

    fn flip_text(&self, source: RawPtr, len_slot: RawPtr, upside_down: bool) -> Result<RawPtr> {
        let text = self.consume_source(source)?;

        let output = match &self.on_flip {
            OnFlip::Table => flip_string(&text, upside_down).into_bytes(),
            OnFlip::Fail => return Err(AbiError::NullOutput),
            OnFlip::Raw(bytes) => bytes.clone(),
        };

        let out_ptr = lock(&self.arena).alloc(output.len());
        self.write_bytes(out_ptr, &output)?;
        let len = u32::try_from(output.len()).map_err(|_| AbiError::AllocFailed {
            len: output.len(),
        })?;
        self.write_bytes(len_slot, &len.to_le_bytes())?;
        Ok(out_ptr)
    }
}

/// Delegation so tests can keep a handle on the runtime they hand to an
/// execution context (for leak accounting and recorded calls).
impl RuntimeAbi for Arc<ScriptedRuntime> {
    fn alloc(&self, len: usize) -> Result<RawPtr> {
        (**self).alloc(len)
    }

    fn dealloc(&self, ptr: RawPtr, len: usize) -> Result<()> {
        (**self).dealloc(ptr, len)
    }

    fn write_bytes(&self, ptr: RawPtr, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(ptr, bytes)
    }

    fn read_bytes(&self, ptr: RawPtr, len: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(ptr, len)
    }

    fn interpret(&self, source: RawPtr, upside_down: bool) -> Result<()> {
        (**self).interpret(source, upside_down)
    }

    fn flip_text(&self, source: RawPtr, len_slot: RawPtr, upside_down: bool) -> Result<RawPtr> {
        (**self).flip_text(source, len_slot, upside_down)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Flip a string the way the runtime's upside-down transform does: reverse
/// it and substitute each character through the inversion table. The table
/// is an involution, so the same transform restores the original; the
/// orientation flag is accepted for ABI fidelity.
pub fn flip_string(text: &str, _upside_down: bool) -> String {
    text.chars().rev().map(flip_char).collect()
}

/// Inversion table. Characters without a defined inversion pass through
/// unchanged, the transform's documented limitation.
pub fn flip_char(c: char) -> char {
    match c {
        'a' => 'ɐ',
        'ɐ' => 'a',
        'b' => 'q',
        'q' => 'b',
        'c' => 'ɔ',
        'ɔ' => 'c',
        'd' => 'p',
        'p' => 'd',
        'e' => 'ǝ',
        'ǝ' => 'e',
        'f' => 'ɟ',
        'ɟ' => 'f',
        'g' => 'ƃ',
        'ƃ' => 'g',
        'h' => 'ɥ',
        'ɥ' => 'h',
        'i' => 'ᴉ',
        'ᴉ' => 'i',
        'j' => 'ɾ',
        'ɾ' => 'j',
        'k' => 'ʞ',
        'ʞ' => 'k',
        'm' => 'ɯ',
        'ɯ' => 'm',
        'n' => 'u',
        'u' => 'n',
        'r' => 'ɹ',
        'ɹ' => 'r',
        't' => 'ʇ',
        'ʇ' => 't',
        'v' => 'ʌ',
        'ʌ' => 'v',
        'w' => 'ʍ',
        'ʍ' => 'w',
        'y' => 'ʎ',
        'ʎ' => 'y',
        'A' => '∀',
        '∀' => 'A',
        'C' => 'Ɔ',
        'Ɔ' => 'C',
        'D' => 'ᗡ',
        'ᗡ' => 'D',
        'E' => 'Ǝ',
        'Ǝ' => 'E',
        'F' => 'Ⅎ',
        'Ⅎ' => 'F',
        'G' => '⅁',
        '⅁' => 'G',
        'J' => 'ſ',
        'ſ' => 'J',
        'L' => '˥',
        '˥' => 'L',
        'M' => 'W',
        'W' => 'M',
        'P' => 'Ԁ',
        'Ԁ' => 'P',
        'R' => 'ᴚ',
        'ᴚ' => 'R',
        'T' => '⊥',
        '⊥' => 'T',
        'U' => '∩',
        '∩' => 'U',
        'V' => 'Λ',
        'Λ' => 'V',
        'Y' => '⅄',
        '⅄' => 'Y',
        '1' => 'Ɩ',
        'Ɩ' => '1',
        '2' => 'ᄅ',
        'ᄅ' => '2',
        '3' => 'Ɛ',
        'Ɛ' => '3',
        '4' => 'ㄣ',
        'ㄣ' => '4',
        '5' => 'ϛ',
        'ϛ' => '5',
        '6' => '9',
        '9' => '6',
        '7' => 'ㄥ',
        'ㄥ' => '7',
        '!' => '¡',
        '¡' => '!',
        '?' => '¿',
        '¿' => '?',
        '.' => '˙',
        '˙' => '.',
        '\'' => ',',
        ',' => '\'',
        '&' => '⅋',
        '⅋' => '&',
        '_' => '‾',
        '‾' => '_',
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_table_is_an_involution() {
        for c in "abcdefghijklmnopqrstuvwxyz0123456789!?.,'&_()[]{}<> GDAY".chars() {
            assert_eq!(flip_char(flip_char(c)), c, "not an involution for {c:?}");
        }
    }

    #[test]
    fn flip_string_reverses_and_substitutes() {
        assert_eq!(flip_string("abc", true), "ɔqɐ");
        assert_eq!(flip_string("ɔqɐ", false), "abc");
    }

    #[test]
    fn arena_rejects_mismatched_free() {
        let rt = ScriptedRuntime::new();
        let ptr = rt.alloc(8).unwrap();
        assert!(matches!(
            rt.dealloc(ptr, 4),
            Err(AbiError::BadPointer { .. })
        ));
        rt.dealloc(ptr, 8).unwrap();
        assert_eq!(rt.live_allocations(), 0);
    }

    #[test]
    fn interpret_consumes_its_source_buffer() {
        let rt = ScriptedRuntime::new();
        let ptr = rt.alloc(6).unwrap();
        rt.write_bytes(ptr, b"gimme\0").unwrap();
        rt.interpret(ptr, false).unwrap();
        assert_eq!(rt.live_allocations(), 0);
        assert_eq!(rt.interpreted(), vec![("gimme".to_owned(), false)]);
    }
}
