use std::time::Duration;

use bitbang_drivers::config::{
	TwoWireConfig,
	DEFAULT_EEPROM_ADDRESS,
};
use bitbang_drivers::sim::{
	BusStats,
	SimClock,
	SimTwoWirePins,
	TwoWireSim,
};
use bitbang_drivers::twowire::{
	Phase,
	TwoWire,
	PAGE_SIZE,
};
use bitbang_drivers::DriverError;

fn setup() -> (TwoWireSim, TwoWire<SimTwoWirePins>) {
	let sim = TwoWireSim::new(SimClock::new(), DEFAULT_EEPROM_ADDRESS);
	let mut bus = TwoWire::new(sim.pins(), TwoWireConfig::default());
	bus.initialize(DEFAULT_EEPROM_ADDRESS).unwrap();
	(sim, bus)
}

fn check_idle(sim: &TwoWireSim, bus: &TwoWire<SimTwoWirePins>) {
	assert_eq!(bus.phase(), Phase::Idle);
	assert!(sim.is_idle(), "bus lines not released");
}

#[test]
fn write_then_read_back() {
	let (sim, mut bus) = setup();
	bus.write(0x1122, 0x24).unwrap();
	assert_eq!(sim.memory(0x1122), 0x24);
	assert_eq!(sim.stats(), BusStats { starts: 1, stops: 1 });
	check_idle(&sim, &bus);

	bus.wait_write_cycle();
	assert_eq!(bus.read(0x1122).unwrap(), 0x24);
	check_idle(&sim, &bus);
}

#[test]
fn read_during_write_cycle_is_refused() {
	let (sim, mut bus) = setup();
	bus.write(0x1122, 0x24).unwrap();
	assert!(sim.is_busy());

	assert_eq!(bus.read(0x1122), Err(DriverError::NotAcknowledged { phase: Phase::SendAddress }));
	check_idle(&sim, &bus);

	let busy = bus.wait_ready(Duration::from_millis(20)).unwrap();
	assert!(busy > Duration::from_secs(0));
	// polling granularity on top of the write cycle
	assert!(busy <= TwoWireConfig::default().write_cycle + Duration::from_millis(1));
	assert!(!sim.is_busy());
	assert_eq!(bus.read(0x1122).unwrap(), 0x24);
}

#[test]
fn wait_ready_gives_up() {
	let (sim, mut bus) = setup();
	bus.write(0x0000, 0x01).unwrap();
	match bus.wait_ready(Duration::from_millis(1)) {
		Err(DriverError::TimedOut { phase: Phase::WaitBusy, waited }) => {
			assert!(waited >= Duration::from_millis(1));
		},
		r => panic!("expected timeout, got {:?}", r),
	}
	check_idle(&sim, &bus);
}

#[test]
fn stretched_clock_times_out() {
	let (sim, mut bus) = setup();
	sim.hold_clock_low(true);
	match bus.write(0x0010, 0x55) {
		Err(DriverError::TimedOut { phase: Phase::Start, waited }) => {
			assert!(waited >= TwoWireConfig::default().stretch_timeout);
		},
		r => panic!("expected timeout, got {:?}", r),
	}
	assert_eq!(bus.phase(), Phase::Idle);

	// bus usable again once the clock is released
	sim.hold_clock_low(false);
	bus.write(0x0010, 0x55).unwrap();
	assert_eq!(sim.memory(0x0010), 0x55);
	check_idle(&sim, &bus);
}

#[test]
fn data_held_low_times_out() {
	let (sim, mut bus) = setup();
	sim.hold_data_low(true);
	let err = bus.read(0x0000).unwrap_err();
	assert!(err.is_timeout(), "unexpected {}", err);
	assert_eq!(bus.phase(), Phase::Idle);

	sim.hold_data_low(false);
	assert_eq!(bus.read(0x0000).unwrap(), 0xff);
}

#[test]
fn absent_device() {
	let sim = TwoWireSim::new(SimClock::new(), DEFAULT_EEPROM_ADDRESS);
	let mut bus = TwoWire::new(sim.pins(), TwoWireConfig::default());
	bus.initialize(0x51).unwrap();

	let nack = Err(DriverError::NotAcknowledged { phase: Phase::SendAddress });
	assert_eq!(bus.write(0x0000, 0x12), nack);
	check_idle(&sim, &bus);
	assert_eq!(bus.read(0x0000).map(|_| ()), nack);
	check_idle(&sim, &bus);
	assert_eq!(sim.memory(0x0000), 0xff);

	let stats = sim.stats();
	assert_eq!(stats.starts, stats.stops);
}

#[test]
fn configuration_errors() {
	let sim = TwoWireSim::new(SimClock::new(), DEFAULT_EEPROM_ADDRESS);
	let mut bus = TwoWire::new(sim.pins(), TwoWireConfig::default());

	assert_eq!(bus.read(0x0000), Err(DriverError::NotInitialized));
	assert_eq!(bus.write(0x0000, 0), Err(DriverError::NotInitialized));
	assert_eq!(bus.initialize(0x80), Err(DriverError::InvalidAddress(0x80)));
	assert_eq!(bus.device_address(), None);

	bus.initialize(DEFAULT_EEPROM_ADDRESS).unwrap();
	assert_eq!(bus.initialize(DEFAULT_EEPROM_ADDRESS), Err(DriverError::AlreadyInitialized));
	assert_eq!(bus.device_address(), Some(DEFAULT_EEPROM_ADDRESS));

	let too_long = [0u8; PAGE_SIZE + 1];
	assert_eq!(
		bus.write_page(0x0000, &too_long),
		Err(DriverError::PageOverflow { len: PAGE_SIZE + 1, page_size: PAGE_SIZE })
	);
	// nothing went over the wire
	assert_eq!(sim.stats(), BusStats::default());
}

#[test]
fn page_write_and_sequential_read() {
	let (sim, mut bus) = setup();
	let data: Vec<u8> = (0..PAGE_SIZE as u8).map(|i| i.wrapping_mul(7)).collect();
	bus.write_page(0x0100, &data).unwrap();
	bus.wait_ready(Duration::from_millis(20)).unwrap();

	let mut back = vec![0u8; PAGE_SIZE];
	bus.read_sequential(0x0100, &mut back).unwrap();
	assert_eq!(back, data);
	check_idle(&sim, &bus);
}

#[test]
fn page_write_wraps_inside_page() {
	let (sim, mut bus) = setup();
	bus.write_page(0x013e, &[1, 2, 3, 4]).unwrap();
	assert_eq!(sim.memory(0x013e), 1);
	assert_eq!(sim.memory(0x013f), 2);
	assert_eq!(sim.memory(0x0100), 3);
	assert_eq!(sim.memory(0x0101), 4);
	assert_eq!(sim.memory(0x0140), 0xff);
}

#[test]
fn reader_continues_past_the_end() {
	let (sim, mut bus) = setup();
	sim.set_memory(0x7ffe, &[0xaa, 0xbb]);
	sim.set_memory(0x0000, &[0xcc]);

	let mut reader = bus.reader(0x7ffe).unwrap();
	let bytes: Result<Vec<u8>, _> = reader.by_ref().take(3).collect();
	assert_eq!(bytes.unwrap(), vec![0xaa, 0xbb, 0xcc]);
	reader.finish().unwrap();
	check_idle(&sim, &bus);
}

#[test]
fn dropped_reader_releases_bus() {
	let (sim, mut bus) = setup();
	sim.set_memory(0x0200, &[0x11, 0x22]);
	{
		let mut reader = bus.reader(0x0200).unwrap();
		assert_eq!(reader.read_byte().unwrap(), 0x11);
	}
	check_idle(&sim, &bus);
	// device got a proper NACK + STOP and answers again
	assert_eq!(bus.read(0x0201).unwrap(), 0x22);
}

#[test]
fn reader_dropped_before_first_byte() {
	let (sim, mut bus) = setup();
	// MSB 0: the device pulls SDA low as soon as the read address is ACKed
	sim.set_memory(0x0000, &[0x00, 0x5a]);
	{
		let _reader = bus.reader(0x0000).unwrap();
	}
	check_idle(&sim, &bus);
	assert_eq!(sim.stats(), BusStats { starts: 2, stops: 1 });
	assert_eq!(bus.read(0x0001).unwrap(), 0x5a);
	check_idle(&sim, &bus);
}

#[test]
fn reader_finished_before_first_byte() {
	let (sim, mut bus) = setup();
	sim.set_memory(0x0300, &[0x01]);
	bus.reader(0x0300).unwrap().finish().unwrap();
	check_idle(&sim, &bus);
	assert_eq!(bus.read(0x0300).unwrap(), 0x01);
}
