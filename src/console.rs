use log::debug;
use spin::Mutex;

use crate::isr;
use crate::keyboard::{self, Keyboard};
use crate::platform::Cpu;
use crate::vga_buffer::{Renderer, TextDisplay};

const PROMPT: &[u8] = b"> ";

pub struct Console<'a, D: TextDisplay, C: Cpu + ?Sized, const N: usize> {
    keyboard: &'a Mutex<Keyboard<N>>,
    screen: &'a Mutex<Renderer<D>>,
    cpu: &'a C,
    /// Characters echoed since the last prompt
    line_len: usize,
}

impl<'a, D, C, const N: usize> Console<'a, D, C, N>
where
    D: TextDisplay,
    C: Cpu + ?Sized,
{
    pub fn new(keyboard: &'a Mutex<Keyboard<N>>, screen: &'a Mutex<Renderer<D>>, cpu: &'a C) -> Self {
        Console {
            keyboard,
            screen,
            cpu,
            line_len: 0,
        }
    }

    pub fn prompt(&mut self) {
        let mut screen = self.screen.lock();
        screen.write(PROMPT);
        screen.flush();
        self.line_len = 0;
    }

    /// Drain the queue, echoing if enabled, and flush once. Returns how many
    /// characters were taken.
    pub fn poll(&mut self) -> usize {
        let keyboard = self.keyboard;
        let echo = isr::without_interrupts(self.cpu, || keyboard.lock().echo_enabled());

        let screen = self.screen;
        let mut screen = screen.lock();
        let mut handled = 0;
        let mut lines = 0;
        while let Some(byte) = keyboard::try_getchar(keyboard, self.cpu) {
            handled += 1;
            if byte == b'\n' {
                lines += 1;
            }
            if echo {
                self.echo(&mut screen, byte);
            }
        }
        if handled > 0 {
            screen.flush();
        }
        if lines > 0 {
            let stats = isr::without_interrupts(self.cpu, || keyboard.lock().stats());
            debug!(
                "keyboard: {} queued, {} debounced, {} overflowed, {} unmapped",
                stats.queued, stats.debounced, stats.overflowed, stats.unmapped
            );
        }
        handled
    }

    pub fn run(&mut self) -> ! {
        loop {
            if self.poll() == 0 {
                keyboard::wait_for_input(self.keyboard, self.cpu);
            }
        }
    }

    fn echo(&mut self, screen: &mut Renderer<D>, byte: u8) {
        match byte {
            b'\n' => {
                screen.putchar(b'\n');
                screen.write(PROMPT);
                self.line_len = 0;
            }
            0x08 => {
                if self.line_len > 0 {
                    screen.move_back();
                    screen.putchar(b' ');
                    screen.move_back();
                    self.line_len -= 1;
                }
            }
            0x20..=0x7e => {
                screen.putchar(byte);
                self.line_len += 1;
            }
            _ => {}
        }
    }
}
