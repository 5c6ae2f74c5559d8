mod calibration_file;
mod lifecycle;
mod safety_scenarios;
mod sensor_front_end;
mod signal_path;
mod transport_link;
mod runner_loop;
