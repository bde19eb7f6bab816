#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod kernel {
    use core::panic::PanicInfo;

    use duckyos::console::Console;
    use duckyos::interrupts::{CPU, KEYBOARD};
    use duckyos::vga_buffer::WRITER;
    use duckyos::{println, serial_println};

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        serial_println!("[PANIC] {}", info);
        println!("{}", info);
        duckyos::hlt_loop();
    }

    #[no_mangle]
    pub extern "C" fn _start() -> ! {
        duckyos::init();

        println!("DuckyOS Keyboard Test");
        println!("Type something, it is echoed back.");

        let mut console = Console::new(&KEYBOARD, &*WRITER, &CPU);
        console.prompt();
        console.run();
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("duckyos is a freestanding kernel; build it with `cargo bootimage`");
}
