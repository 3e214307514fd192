extern crate bme680;
extern crate i2cdev;

use bme680::{Bme680, PowerMode, DEFAULT_ADDRESS, SEA_LEVEL_HPA};
use i2cdev::linux::LinuxI2CDevice;

fn main() {
    let bus = LinuxI2CDevice::new("/dev/i2c-1", DEFAULT_ADDRESS).expect("Couldn't open I2C bus");
    let mut sensor =
        Bme680::initialize(bus, SEA_LEVEL_HPA, true).expect("Couldn't create BME680 object");
    sensor.set_power_mode(PowerMode::LowPower);
    loop {
        let temp = sensor.get_temperature().expect("Couldn't get temp");
        println!("It's {}", temp);
        let rh = sensor.get_humidity().expect("Couldn't get rh");
        println!("It's {} relative humidity", rh);
        let pressure = sensor.get_pressure().expect("Couldn't get pressure");
        println!("The pressure is {}", pressure);
        if let Ok(altitude) = sensor.get_altitude() {
            println!("Altitude         :  {}", altitude);
        }
        if let Ok(gas) = sensor.get_gas() {
            println!("Gas resistance   :  {}", gas);
        }
        if sensor.is_stale() {
            println!("(reading may be stale)");
        }
        ::std::thread::sleep(::std::time::Duration::from_millis(3300));
    }
}
