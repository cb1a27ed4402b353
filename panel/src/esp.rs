//! ESP32 hardware adapters: HD44780 LCD behind a PCF8574 I2C backpack,
//! DHT22 on a single-wire GPIO, DS1307 RTC + NVRAM on the same I2C bus,
//! three debounced buttons and the heating relay.

use std::{
    cell::RefCell,
    rc::Rc,
    time::{Duration, Instant},
};

use anyhow::Context;
use esp_idf_hal::{
    delay::{Ets, FreeRtos, BLOCK},
    gpio::{AnyIOPin, AnyOutputPin, IOPin, Input, InputOutput, Output, OutputPin, PinDriver, Pull},
    i2c::{I2cConfig, I2cDriver},
    peripherals::Peripherals,
    units::FromValueType,
};
use esp_idf_svc::log::EspLogger;
use log::{info, warn};

use thermostat_core::{
    Button, ButtonPad, DateTime, EnvironmentSensor, PanelConfig, Relay, Rtc, SensorError,
    SensorSample, TargetDial, TextDisplay, Thermostat, DEGREE,
};

const LCD_I2C_ADDR: u8 = 0x27;
const RTC_I2C_ADDR: u8 = 0x68;
const RTC_NVRAM_BASE: u8 = 0x08;
const TICK_DELAY_MS: u32 = 50;
const BUTTON_DEBOUNCE: Duration = Duration::from_millis(30);

type SharedI2c = Rc<RefCell<I2cDriver<'static>>>;

// PCF8574 wiring of the LCD backpack.
const LCD_RS: u8 = 0x01;
const LCD_EN: u8 = 0x04;
const LCD_BACKLIGHT: u8 = 0x08;

const LCD_CMD_CLEAR: u8 = 0x01;
const LCD_CMD_HOME: u8 = 0x02;
const LCD_CMD_DISPLAY_CTL: u8 = 0x08;
const LCD_DISPLAY_ON: u8 = 0x04;
const LCD_BLINK_ON: u8 = 0x01;
const LCD_CMD_SET_DDRAM: u8 = 0x80;

struct LcdBackpack {
    bus: SharedI2c,
    backlight: bool,
    display_ctl: u8,
}

impl LcdBackpack {
    fn new(bus: SharedI2c) -> anyhow::Result<Self> {
        let mut lcd = Self {
            bus,
            backlight: true,
            display_ctl: LCD_CMD_DISPLAY_CTL | LCD_DISPLAY_ON,
        };

        // 4-bit init sequence per the HD44780 datasheet.
        FreeRtos::delay_ms(50);
        for _ in 0..3 {
            lcd.write_nibble(0x30, false)?;
            FreeRtos::delay_ms(5);
        }
        lcd.write_nibble(0x20, false)?;
        lcd.command(0x28)?; // 4-bit, 2 lines, 5x8 font
        lcd.command(lcd.display_ctl)?;
        lcd.command(0x06)?; // entry mode: increment, no shift
        lcd.command(LCD_CMD_CLEAR)?;
        FreeRtos::delay_ms(2);
        Ok(lcd)
    }

    fn expander_write(&mut self, byte: u8) -> anyhow::Result<()> {
        let byte = if self.backlight {
            byte | LCD_BACKLIGHT
        } else {
            byte
        };
        self.bus
            .borrow_mut()
            .write(LCD_I2C_ADDR, &[byte], BLOCK)
            .context("lcd expander write")?;
        Ok(())
    }

    fn write_nibble(&mut self, nibble: u8, rs: bool) -> anyhow::Result<()> {
        let flags = if rs { LCD_RS } else { 0 };
        let value = (nibble & 0xF0) | flags;
        self.expander_write(value | LCD_EN)?;
        Ets::delay_us(1);
        self.expander_write(value)?;
        Ets::delay_us(50);
        Ok(())
    }

    fn write_byte(&mut self, byte: u8, rs: bool) -> anyhow::Result<()> {
        self.write_nibble(byte & 0xF0, rs)?;
        self.write_nibble(byte << 4, rs)
    }

    fn command(&mut self, byte: u8) -> anyhow::Result<()> {
        self.write_byte(byte, false)
    }

    fn put(&mut self, byte: u8) {
        if let Err(err) = self.write_byte(byte, true) {
            warn!("lcd data write failed: {err:#}");
        }
    }

    fn run(&mut self, byte: u8) {
        if let Err(err) = self.command(byte) {
            warn!("lcd command failed: {err:#}");
        }
    }
}

impl TextDisplay for LcdBackpack {
    fn clear(&mut self) {
        self.run(LCD_CMD_CLEAR);
        FreeRtos::delay_ms(2);
    }

    fn home(&mut self) {
        self.run(LCD_CMD_HOME);
        FreeRtos::delay_ms(2);
    }

    fn set_cursor(&mut self, col: u8, row: u8) {
        let address = col + if row == 0 { 0 } else { 0x40 };
        self.run(LCD_CMD_SET_DDRAM | address);
    }

    fn print(&mut self, text: &str) {
        for ch in text.chars() {
            let byte = match ch {
                DEGREE => 0xDF, // degree sign in the HD44780 A00 ROM
                ch if ch.is_ascii() => ch as u8,
                _ => b'?',
            };
            self.put(byte);
        }
    }

    fn set_blink(&mut self, on: bool) {
        if on {
            self.display_ctl |= LCD_BLINK_ON;
        } else {
            self.display_ctl &= !LCD_BLINK_ON;
        }
        self.run(self.display_ctl);
    }

    fn set_backlight(&mut self, on: bool) {
        if self.backlight != on {
            self.backlight = on;
            if let Err(err) = self.expander_write(0) {
                warn!("lcd backlight write failed: {err:#}");
            }
        }
    }
}

struct Dht22 {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
}

impl Dht22 {
    fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input_output_od(pin).context("dht pin")?;
        pin.set_high().context("dht pin release")?;
        Ok(Self { pin })
    }

    /// Busy-wait until the line reaches `level`; returns the wait in us.
    fn wait_level(&self, level: bool, timeout_us: u32) -> Result<u32, SensorError> {
        let mut waited = 0;
        while self.pin.is_high() != level {
            if waited >= timeout_us {
                return Err(SensorError::Timeout);
            }
            Ets::delay_us(1);
            waited += 1;
        }
        Ok(waited)
    }

    fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        // Start pulse: hold low >1 ms, then release and let the sensor
        // answer with 80 us low / 80 us high.
        self.pin.set_low().map_err(|_| SensorError::NotPresent)?;
        Ets::delay_us(1_100);
        self.pin.set_high().map_err(|_| SensorError::NotPresent)?;

        self.wait_level(false, 100)?;
        self.wait_level(true, 100)?;
        self.wait_level(false, 100)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            self.wait_level(true, 80)?;
            let high_us = self.wait_level(false, 100)?;
            if high_us > 40 {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    }
}

impl EnvironmentSensor for Dht22 {
    fn read(&mut self) -> Result<SensorSample, SensorError> {
        let frame = self.read_frame()?;

        let sum = frame[0]
            .wrapping_add(frame[1])
            .wrapping_add(frame[2])
            .wrapping_add(frame[3]);
        if sum != frame[4] {
            return Err(SensorError::Checksum);
        }

        let humidity = f32::from(u16::from_be_bytes([frame[0], frame[1]])) / 10.0;
        let raw_temp = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]);
        let mut temperature = f32::from(raw_temp) / 10.0;
        if frame[2] & 0x80 != 0 {
            temperature = -temperature;
        }

        Ok(SensorSample {
            temperature,
            humidity,
        })
    }
}

fn bcd_decode(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

fn bcd_encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

struct Ds1307 {
    bus: SharedI2c,
    last_good: DateTime,
}

impl Ds1307 {
    fn new(bus: SharedI2c) -> Self {
        Self {
            bus,
            last_good: DateTime {
                year: 2000,
                month: 1,
                day: 1,
                hour: 0,
                minute: 0,
                second: 0,
            },
        }
    }

    fn read_registers(&mut self) -> anyhow::Result<[u8; 7]> {
        let mut registers = [0u8; 7];
        self.bus
            .borrow_mut()
            .write_read(RTC_I2C_ADDR, &[0x00], &mut registers, BLOCK)
            .context("rtc register read")?;
        Ok(registers)
    }
}

impl Rtc for Ds1307 {
    fn now(&mut self) -> DateTime {
        match self.read_registers() {
            Ok(registers) => {
                self.last_good = DateTime {
                    second: bcd_decode(registers[0] & 0x7F),
                    minute: bcd_decode(registers[1]),
                    hour: bcd_decode(registers[2] & 0x3F),
                    day: bcd_decode(registers[4]),
                    month: bcd_decode(registers[5]),
                    year: 2000 + u16::from(bcd_decode(registers[6])),
                };
                self.last_good
            }
            Err(err) => {
                warn!("rtc read failed: {err:#}");
                self.last_good
            }
        }
    }

    fn adjust(&mut self, datetime: &DateTime) {
        let payload = [
            0x00, // register pointer; also clears the clock-halt bit
            bcd_encode(datetime.second),
            bcd_encode(datetime.minute),
            bcd_encode(datetime.hour),
            0x01, // day-of-week, unused by the panel
            bcd_encode(datetime.day),
            bcd_encode(datetime.month),
            bcd_encode((datetime.year % 100) as u8),
        ];
        if let Err(err) = self
            .bus
            .borrow_mut()
            .write(RTC_I2C_ADDR, &payload, BLOCK)
        {
            warn!("rtc adjust failed: {err}");
        }
    }

    fn read_byte(&mut self, index: u8) -> u8 {
        let mut value = [0xFFu8];
        if let Err(err) = self.bus.borrow_mut().write_read(
            RTC_I2C_ADDR,
            &[RTC_NVRAM_BASE + index],
            &mut value,
            BLOCK,
        ) {
            // 0xFF reads like fresh NVRAM and gets normalized at load.
            warn!("nvram read failed: {err}");
        }
        value[0]
    }

    fn write_byte(&mut self, index: u8, value: u8) {
        if let Err(err) =
            self.bus
                .borrow_mut()
                .write(RTC_I2C_ADDR, &[RTC_NVRAM_BASE + index, value], BLOCK)
        {
            warn!("nvram write failed: {err}");
        }
    }
}

struct DebouncedButton {
    pin: PinDriver<'static, AnyIOPin, Input>,
    stable: bool,
    reported: bool,
    last_raw: bool,
    last_change: Instant,
}

impl DebouncedButton {
    fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input(pin).context("button pin")?;
        pin.set_pull(Pull::Up).context("button pull-up")?;
        Ok(Self {
            pin,
            stable: false,
            reported: false,
            last_raw: false,
            last_change: Instant::now(),
        })
    }

    fn sample(&mut self) {
        // Active low.
        let raw = self.pin.is_low();
        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_change = Instant::now();
        } else if self.last_change.elapsed() >= BUTTON_DEBOUNCE {
            self.stable = raw;
        }
    }
}

struct GpioPad {
    next: DebouncedButton,
    previous: DebouncedButton,
    select: DebouncedButton,
}

impl GpioPad {
    fn get(&mut self, button: Button) -> &mut DebouncedButton {
        match button {
            Button::Next => &mut self.next,
            Button::Previous => &mut self.previous,
            Button::Select => &mut self.select,
        }
    }
}

impl ButtonPad for GpioPad {
    fn was_toggled(&mut self, button: Button) -> bool {
        let state = self.get(button);
        state.sample();
        let toggled = state.stable != state.reported;
        state.reported = state.stable;
        toggled
    }

    fn is_pressed(&mut self, button: Button) -> bool {
        let state = self.get(button);
        state.sample();
        state.stable
    }
}

/// The target potentiometer is not fitted on the current board revision;
/// manual mode runs against a fixed ceiling target.
struct FixedDial;

impl TargetDial for FixedDial {
    fn read(&mut self) -> f32 {
        30.0
    }
}

struct RelayPin {
    pin: PinDriver<'static, AnyOutputPin, Output>,
}

impl Relay for RelayPin {
    fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(err) = result {
            warn!("relay write failed: {err}");
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_sys::link_patches();
    EspLogger::initialize_default();

    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let pins = peripherals.pins;

    let i2c_config = I2cConfig::new().baudrate(100.kHz().into());
    let bus: SharedI2c = Rc::new(RefCell::new(
        I2cDriver::new(peripherals.i2c0, pins.gpio21, pins.gpio22, &i2c_config)
            .context("i2c bus")?,
    ));

    let display = LcdBackpack::new(bus.clone()).context("lcd init")?;
    let sensor = Dht22::new(pins.gpio23.downgrade()).context("dht init")?;
    let rtc = Ds1307::new(bus);
    let pad = GpioPad {
        next: DebouncedButton::new(pins.gpio27.downgrade())?,
        previous: DebouncedButton::new(pins.gpio25.downgrade())?,
        select: DebouncedButton::new(pins.gpio26.downgrade())?,
    };
    let relay = RelayPin {
        pin: PinDriver::output(pins.gpio2.downgrade_output()).context("relay pin")?,
    };

    let mut thermostat = Thermostat::new(
        display,
        sensor,
        rtc,
        pad,
        FixedDial,
        relay,
        PanelConfig::default(),
    );

    let started = Instant::now();
    thermostat.begin(0);
    info!("thermostat panel started");

    loop {
        thermostat.tick(started.elapsed().as_millis() as u64);
        FreeRtos::delay_ms(TICK_DELAY_MS);
    }
}
