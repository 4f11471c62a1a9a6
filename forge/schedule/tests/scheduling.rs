use forge_lim::{
    ComponentIdx, ComponentKind, Design, ExitIdx, ExitKind, Latency, Pin,
    Spacing,
};
use forge_schedule::{
    Context, PassManager,
    passes::{ResourceSequencer, Scheduler},
};
use forge_utils::ErrorKind;

/// A register inside `parent` with a single entry.
fn reg(
    design: &mut Design,
    parent: ComponentIdx,
    name: &str,
    latency: Latency,
    driver: Option<ExitIdx>,
) -> (ComponentIdx, ExitIdx) {
    let c = design
        .add_component(name, ComponentKind::Reg, Some(parent))
        .unwrap();
    let exit = design.make_exit(c, ExitKind::Done, latency).unwrap();
    design.component_add_entry(c, driver).unwrap();
    (c, exit)
}

#[test]
fn resource_delay_pushes_past_control_chain() {
    let mut design = Design::new();
    let top = design.add_component("top", ComponentKind::Module, None).unwrap();
    let done = design.make_exit(top, ExitKind::Done, Latency::ZERO).unwrap();
    let (x, x_done) = reg(&mut design, top, "x", Latency::get(1), None);
    let (y, y_done) = reg(&mut design, top, "y", Latency::get(2), Some(x_done));
    let (z, z_done) = reg(&mut design, top, "z", Latency::ONE, Some(y_done));
    design.connect_resource_dependency(z, x_done, 0, 4).unwrap();
    let outbuf = design.exits[done].outbuf.unwrap();
    design.connect_control_dependency(outbuf, z_done, 0).unwrap();

    let tracker = Scheduler::new(100).schedule(&mut design).unwrap();
    assert_eq!(tracker.start_latency(x), Some(&Latency::ZERO));
    assert_eq!(tracker.start_latency(y), Some(&Latency::get(1)));
    assert_eq!(tracker.start_latency(z), Some(&Latency::get(5)));
    assert_eq!(tracker.start_latency(z).unwrap().to_string(), "[5:5]");
    assert_eq!(tracker.exit_latency(z_done), Some(&Latency::get(6)));
    assert_eq!(tracker.component_latency(top), Some(&Latency::get(6)));
}

#[test]
fn invalid_go_to_go_is_rescheduled_as_done_to_go() {
    let mut design = Design::new();
    let top = design.add_component("top", ComponentKind::Module, None).unwrap();
    let latency = Latency::range(1, 3).unwrap();
    let (_, a_done) = reg(&mut design, top, "a", latency, None);
    let (b, _) = reg(&mut design, top, "b", Latency::ONE, None);
    let dep = design.connect_go_to_go_dependency(b, a_done, 0, 2).unwrap();
    assert_eq!(design.effective_spacing(dep), Some(Spacing::GoToGo));

    let tracker = Scheduler::new(100).schedule(&mut design).unwrap();
    assert!(!design.precondition_is_valid(dep));
    assert_eq!(design.effective_spacing(dep), Some(Spacing::DoneToGo));
    assert_eq!(tracker.start_latency(b), Some(&Latency::range(3, 5).unwrap()));
}

#[test]
fn combinational_source_keeps_go_to_go() {
    let mut design = Design::new();
    let top = design.add_component("top", ComponentKind::Module, None).unwrap();
    let (_, a_done) = reg(&mut design, top, "a", Latency::ZERO, None);
    let (b, _) = reg(&mut design, top, "b", Latency::ONE, None);
    let dep = design.connect_go_to_go_dependency(b, a_done, 0, 2).unwrap();

    let tracker = Scheduler::new(100).schedule(&mut design).unwrap();
    assert!(design.precondition_is_valid(dep));
    assert_eq!(design.effective_spacing(dep), Some(Spacing::GoToGo));
    assert_eq!(tracker.start_latency(b), Some(&Latency::get(2)));
}

#[test]
fn sequenced_accesses_are_scheduled_apart() {
    let mut design = Design::new();
    let top = design.add_component("top", ComponentKind::Module, None).unwrap();
    let mem = design.add_resource("mem", 3);
    let (first, _) = reg(&mut design, top, "first", Latency::ONE, None);
    let (second, _) = reg(&mut design, top, "second", Latency::ONE, None);
    design.access_resource(first, mem);
    design.access_resource(second, mem);

    ResourceSequencer::new(true).sequence(&mut design).unwrap();
    let tracker = Scheduler::new(100).schedule(&mut design).unwrap();
    assert_eq!(tracker.start_latency(first), Some(&Latency::ZERO));
    // `first` takes a clock, so the spacing counts from its done.
    assert_eq!(tracker.start_latency(second), Some(&Latency::get(4)));
}

/// A module reading a two-stage pin at an address given by its caller and
/// returning the result.
fn pin_reader() -> (Design, ComponentIdx, ExitIdx) {
    let mut design = Design::new();
    let top = design.add_component("top", ComponentKind::Module, None).unwrap();
    let addr = design.make_data_port(top, "addr", 8, false);
    let done = design.make_exit(top, ExitKind::Done, Latency::ZERO).unwrap();
    let out = design.make_data_bus(done, "out", 16, true);

    let gpio = design.add_pin(Pin::new("gpio", 16, true).with_address(8), 1);
    let read = design.make_pin_read(gpio, top, 2).unwrap();
    let read_done = design.components[read].exits[0];
    design.component_add_entry(read, None).unwrap();
    let addr_bus = design.ports[addr].peer.unwrap();
    let read_addr = design.components[read].data_ports[0];
    design.connect_data_dependency(addr_bus, read_addr, 0).unwrap();

    let outbuf = design.exits[done].outbuf.unwrap();
    let result = design.exits[read_done].data[0];
    let out_port = design.buses[out].peer.unwrap();
    design.connect_data_dependency(result, out_port, 0).unwrap();
    design.connect_control_dependency(outbuf, read_done, 0).unwrap();
    (design, read, done)
}

#[test]
fn default_pipeline_schedules_physical_pins() {
    let (design, read, done) = pin_reader();
    let mut ctx = Context::new(design)
        .with_opts(["latency-schedule:max-iterations=5"]);
    let pm = PassManager::default_passes().unwrap();
    pm.execute_plan(&mut ctx, &["all".to_string()], &[]).unwrap();

    let design = &ctx.design;
    let physical = design.components[read].physical.unwrap();
    let tracker = ctx.latencies.as_ref().unwrap();
    let read_done = design.components[read].exits[0];
    let physical_done = design.components[physical].exits[0];
    assert_eq!(tracker.exit_latency(read_done), Some(&Latency::get(2)));
    assert_eq!(tracker.exit_duration(physical_done), Some(&Latency::get(2)));
    assert_eq!(tracker.exit_latency(physical_done), Some(&Latency::get(2)));
    assert_eq!(tracker.exit_duration(done), Some(&Latency::get(2)));
}

#[test]
fn physical_write_takes_a_clock() {
    let mut design = Design::new();
    let top = design.add_component("top", ComponentKind::Module, None).unwrap();
    let val = design.make_data_port(top, "val", 8, false);
    let gpio = design.add_pin(Pin::new("gpio", 8, false), 1);
    let write = design.make_pin_write(gpio, top).unwrap();
    design.component_add_entry(write, None).unwrap();
    let data = design.components[write].data_ports[0];
    let val_bus = design.ports[val].peer.unwrap();
    design.connect_data_dependency(val_bus, data, 0).unwrap();
    let physical = design.make_physical_component(write).unwrap();

    let tracker = Scheduler::new(100).schedule(&mut design).unwrap();
    let logical_done = design.components[write].exits[0];
    let physical_done = design.components[physical].exits[0];
    assert_eq!(tracker.exit_latency(logical_done), Some(&Latency::ONE));
    assert_eq!(tracker.exit_duration(physical_done), Some(&Latency::ONE));
    assert_eq!(tracker.exit_latency(physical_done), Some(&Latency::ONE));
}

#[test]
fn sequenced_pin_accesses_carry_into_physical_modules() {
    let mut design = Design::new();
    let top = design.add_component("top", ComponentKind::Module, None).unwrap();
    let val = design.make_data_port(top, "val", 8, false);
    let gpio = design.add_pin(Pin::new("gpio", 8, false), 2);
    let write = design.make_pin_write(gpio, top).unwrap();
    design.component_add_entry(write, None).unwrap();
    let data = design.components[write].data_ports[0];
    let val_bus = design.ports[val].peer.unwrap();
    design.connect_data_dependency(val_bus, data, 0).unwrap();
    let read = design.make_pin_read(gpio, top, 1).unwrap();
    design.component_add_entry(read, None).unwrap();

    let mut ctx = Context::new(design);
    let pm = PassManager::default_passes().unwrap();
    pm.execute_plan(&mut ctx, &["all".to_string()], &[]).unwrap();

    let design = &ctx.design;
    let tracker = ctx.latencies.as_ref().unwrap();
    let physical = design.components[read].physical.unwrap();
    // The write takes a clock, so the read waits for its done plus spacing.
    assert_eq!(tracker.start_latency(read), Some(&Latency::get(3)));
    assert_eq!(tracker.start_latency(physical), Some(&Latency::get(3)));
}

#[test]
fn excluded_passes_do_not_run() {
    let (design, read, _) = pin_reader();
    let mut ctx = Context::new(design);
    let pm = PassManager::default_passes().unwrap();
    let excl = ["physical-pins".to_string()];
    pm.execute_plan(&mut ctx, &["all".to_string()], &excl).unwrap();
    assert!(ctx.design.components[read].physical.is_none());
    assert!(ctx.latencies.is_some());
}

#[test]
fn iteration_bound_comes_from_options() {
    let (design, _, _) = pin_reader();
    let mut ctx = Context::new(design)
        .with_opts(["latency-schedule:max-iterations=1"]);
    let pm = PassManager::default_passes().unwrap();
    let err = pm
        .execute_plan(&mut ctx, &["latency-schedule".to_string()], &[])
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PassAssumption(..)));
    assert!(err.to_string().contains("did not converge"), "{err}");
}
