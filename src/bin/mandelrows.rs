extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate image;
extern crate mandelrows;
extern crate num;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::ColorType;
use mandelrows::escape::remap;
use mandelrows::{render_all, Config, Image};
use num::{clamp, Complex};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const WORKERS: &str = "workers";
const ITERATIONS: &str = "iterations";
const PRINT: &str = "print";

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandelrows")
        .version("0.1.0")
        .about("Row-partitioned Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Write the image to this file as a binary PGM"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("1024x1024")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2.0,-2.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the mandelbrot space"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("2.0,2.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the mandelbrot space"),
        )
        .arg(
            Arg::with_name(WORKERS)
                .required(false)
                .long(WORKERS)
                .short("w")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        4096,
                        "Could not parse worker count",
                        "Worker count must be between 1 and 4096",
                    )
                })
                .help("Number of workers sharing the rows (default: one per CPU)"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1000")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Iteration cap per point"),
        )
        .arg(
            Arg::with_name(PRINT)
                .long(PRINT)
                .short("p")
                .help("Print the iteration counts to stdout"),
        )
        .get_matches()
}

fn write_image(outfile: &str, pixels: &[u8], bounds: (usize, usize)) -> Result<(), io::Error> {
    let path = Path::new(outfile);
    let output = File::create(&path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Graymap(SampleEncoding::Binary));
    encoder.encode(pixels, bounds.0 as u32, bounds.1 as u32, ColorType::Gray(8))?;
    Ok(())
}

fn greyscale(image: &Image) -> Vec<u8> {
    let maxi = u64::from(image.max_iterations());
    image
        .escape_counts()
        .iter()
        .map(|&s| clamp((u64::from(s) * 255) / maxi, 0, 255) as u8)
        .collect()
}

fn print_counts(image: &Image) -> Result<(), io::Error> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for row in image.rows() {
        for &k in row {
            write!(out, "{:3} ", remap(k, image.max_iterations()))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

fn fetch<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches.value_of(name).unwrap_or_default()
}

fn execute(matches: &ArgMatches) -> Result<(), failure::Error> {
    let size = parse_pair::<usize>(fetch(matches, SIZE), 'x')
        .ok_or_else(|| failure::err_msg("Error parsing image dimensions"))?;
    let leftlower = parse_complex(fetch(matches, LEFTLOWER))
        .ok_or_else(|| failure::err_msg("Error parsing left lower point"))?;
    let rightupper = parse_complex(fetch(matches, RIGHTUPPER))
        .ok_or_else(|| failure::err_msg("Error parsing right upper point"))?;
    let workers = match matches.value_of(WORKERS) {
        Some(w) => usize::from_str(w)?,
        None => num_cpus::get(),
    };
    let iterations = u32::from_str(fetch(matches, ITERATIONS))?;

    let config = Config::new(size.0, size.1, iterations)
        .with_bounds(leftlower, rightupper)
        .with_workers(workers);

    let reports = render_all(&config)?;
    for report in &reports {
        eprintln!(
            "(PERF) [rank {}] Computing Time (seconds) = {:.6}",
            report.rank,
            report.compute.as_secs_f64()
        );
        eprintln!(
            "(PERF) [rank {}] Communication Time (seconds) = {:.6}",
            report.rank,
            report.communication.as_secs_f64()
        );
    }

    let coordinator = reports
        .into_iter()
        .next()
        .ok_or_else(|| failure::err_msg("No coordinator report"))?;
    if let Some(total) = coordinator.total_ops() {
        eprintln!("(PERF) Total operations = {}", total);
    }
    let image = coordinator
        .image
        .ok_or_else(|| failure::err_msg("The coordinator produced no image"))?;

    if matches.is_present(PRINT) {
        print_counts(&image)?;
    }
    if let Some(outfile) = matches.value_of(OUTPUT) {
        write_image(outfile, &greyscale(&image), (image.width(), image.height()))?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = execute(&matches) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
