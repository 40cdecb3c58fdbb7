//! Print static chip information and the supported parameter ranges

use syn6288_driver::chip::{BaudRate, Mode, TextType};
use syn6288_driver::{NoDelay, Syn6288, VirtualChip};

fn main() {
    let info = Syn6288::<VirtualChip, NoDelay>::info();
    let (major, minor) = info.driver_version_parts();

    println!("🔊 {}\n", info.chip_name);
    println!("  Manufacturer:   {}", info.manufacturer_name);
    println!("  Interface:      {}", info.interface);
    println!(
        "  Supply:         {:.1} V – {:.1} V",
        info.supply_voltage_min_v, info.supply_voltage_max_v
    );
    println!("  Max current:    {:.0} mA", info.max_current_ma);
    println!(
        "  Temperature:    {:.0} °C – {:.0} °C",
        info.temperature_min_c, info.temperature_max_c
    );
    println!("  Driver version: {major}.{minor}");
    println!();

    let rates: Vec<String> = BaudRate::ALL.iter().map(ToString::to_string).collect();
    let types: Vec<&str> = TextType::ALL.iter().map(|t| t.name()).collect();
    println!("  Baud rates:     {}", rates.join(", "));
    println!("  Text types:     {}", types.join(", "));
    println!("  Modes:          common, background-1 … background-{}", Mode::ALL.len() - 1);
}
