use std::fs::{create_dir_all, File};
use std::io::prelude::Write;
use std::path::Path;
use std::process::exit;

extern crate clap;
use clap::{App, Arg, ArgMatches};

use crossbeam::crossbeam_channel;
use flatgate_engine::pipeline::{EngineRunner, Request, Response, Runner};

fn parse_args<'a>() -> ArgMatches<'a> {
    App::new("flatgate")
        .version("0.1.0")
        .about("Flattens FortiGate firewall policies into CSV rows and answers address lookups against them")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("FortiGate configuration dump")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("lookup")
                .short("l")
                .long("lookup")
                .value_name("FILE")
                .help("Lookup list, one SRC,DST[,comment] per line")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("flatten-addresses")
                .long("flatten-addresses")
                .help("Replace named address columns with their leaf values"),
        )
        .arg(
            Arg::with_name("flatten-services")
                .long("flatten-services")
                .help("Replace the named service column with per-leaf protocol/port tokens"),
        )
        .arg(
            Arg::with_name("fqdn-geo-match-all")
                .long("fqdn-geo-match-all")
                .help("Count FQDN/geography values as matching IP queries and vice versa"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .help("Write every CSV output into DIR instead of printing the flattened view")
                .takes_value(true),
        )
        .get_matches()
}

fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("flatgate: cannot read {}: {}", path, err);
            exit(1);
        }
    }
}

fn write_output(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    let mut file = match File::create(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("flatgate: cannot create {}: {}", path.display(), err);
            exit(1);
        }
    };
    if let Err(err) = file.write_all(text.as_bytes()) {
        eprintln!("flatgate: cannot write {}: {}", path.display(), err);
        exit(1);
    }
}

fn main() {
    let matches = parse_args();
    let config_text = read_file(matches.value_of("config").unwrap());
    let lookup_text = matches.value_of("lookup").map(read_file);

    let (request_sender, request_receiver) = crossbeam_channel::unbounded();
    let (response_sender, response_receiver) = crossbeam_channel::unbounded();

    request_sender
        .send(Request::MakeList {
            config: config_text,
        })
        .unwrap();
    request_sender.send(Request::Normalize).unwrap();
    request_sender
        .send(Request::Flatten {
            addresses: matches.is_present("flatten-addresses"),
            services: matches.is_present("flatten-services"),
        })
        .unwrap();
    if let Some(list) = lookup_text {
        request_sender
            .send(Request::Lookup {
                list,
                fqdn_geo_match_all: matches.is_present("fqdn-geo-match-all"),
            })
            .unwrap();
    }
    drop(request_sender);

    EngineRunner::run(request_receiver, response_sender);

    let mut outputs: Vec<(&'static str, String)> = Vec::new();
    let mut flattened_text = String::new();
    for response in response_receiver.iter() {
        match response {
            Response::MadeList {
                addresses,
                services,
            } => {
                outputs.push(("address_list.csv", addresses));
                outputs.push(("service_list.csv", services));
            }
            Response::Normalized { text } => outputs.push(("normalized.csv", text)),
            Response::Flattened { text } => {
                flattened_text = text.clone();
                outputs.push(("flattened.csv", text));
            }
            Response::LookedUp {
                all,
                without_ineffectual,
            } => {
                outputs.push(("lookup_all.csv", all));
                outputs.push(("lookup_effective.csv", without_ineffectual));
            }
        }
    }

    match matches.value_of("output") {
        Some(dir) => {
            let dir = Path::new(dir);
            if let Err(err) = create_dir_all(dir) {
                eprintln!("flatgate: cannot create {}: {}", dir.display(), err);
                exit(1);
            }
            for (name, text) in &outputs {
                write_output(dir, name, text);
            }
        }
        None => println!("{}", flattened_text),
    }
}
