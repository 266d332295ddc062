#![allow(missing_docs)]

mod cli;
mod range;

use std::io::Write;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;

use caps::casimir::free_energy;
use caps::fresnel::DielectricModel;
use caps::material::MaterialTable;
use caps::params::{Parameters, SphereMaterial};

use cli::Opts;
use range::ValueSpec;

fn main() -> ExitCode {
    let opts = Opts::parse();
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("caps: error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn build_sphere(opts: &Opts) -> Result<SphereMaterial> {
    match (opts.omegap, opts.gamma) {
        (None, None) => Ok(SphereMaterial::PerfectReflector),
        (Some(omegap), gamma) => Ok(SphereMaterial::Drude {
            omegap,
            gamma: gamma.unwrap_or(0.0),
        }),
        (None, Some(_)) => Err(anyhow::anyhow!("--gamma requires --omegap")),
    }
}

fn build_plane(opts: &Opts) -> Result<DielectricModel> {
    match &opts.material {
        None => Ok(DielectricModel::PerfectReflector),
        Some(path) => {
            let table = MaterialTable::from_path(path)
                .with_context(|| format!("unable to read material file '{}'", path.display()))?;
            Ok(DielectricModel::Table(table))
        }
    }
}

fn run(opts: &Opts) -> Result<()> {
    let l_by_r_values = ValueSpec::parse(&opts.l_by_r)
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid --L/R")?
        .values();
    let t_values = ValueSpec::parse(&opts.t)
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid --T")?
        .values();

    let sphere = build_sphere(opts)?;
    let plane = build_plane(opts)?;

    if !opts.quiet {
        eprintln!("# {}", Parameters::compile_info());
    }

    let stdout = std::io::stdout();
    let mut out: Box<dyn Write> = if opts.buffering {
        Box::new(std::io::BufWriter::new(stdout.lock()))
    } else {
        Box::new(stdout.lock())
    };

    for (l_by_r, t) in l_by_r_values.iter().copied().cartesian_product(t_values.iter().copied()) {
        let mut params = Parameters::new(l_by_r, t, opts.precision).context("invalid parameters")?;

        if let Some(lscale) = opts.lscale {
            params.set_lscale(lscale).context("invalid --lscale")?;
        }
        if let Some(lmax) = opts.lmax {
            params.set_lmax(lmax).context("invalid --lmax")?;
        }
        params.set_cores(opts.cores).context("invalid --cores")?;
        params.set_sphere(sphere);
        params.set_plane(plane.clone());

        if !opts.quiet {
            eprintln!("# L/R = {l_by_r}, T = {t}, lmax = {}", params.lmax());
        }

        let start = Instant::now();
        let (f, nmax, warnings) = free_energy(&params)?;
        let elapsed = start.elapsed().as_secs_f64();

        if !opts.quiet {
            for warning in &warnings {
                eprintln!("# warning: {warning}");
            }
        }

        writeln!(
            out,
            "{l_by_r:.14e}, {t:.14e}, {f:.14e}, {}, {nmax}, {elapsed:.14e}",
            params.lmax()
        )?;
        if !opts.buffering {
            out.flush()?;
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_command() {
        use clap::CommandFactory;
        Opts::command().debug_assert();
    }

    #[test]
    fn rejects_gamma_without_omegap() {
        let opts = Opts {
            l_by_r: "0.5".to_owned(),
            t: "1.0".to_owned(),
            gamma: Some(0.1),
            omegap: None,
            material: None,
            lscale: None,
            lmax: None,
            cores: 1,
            precision: 1e-10,
            buffering: false,
            quiet: true,
        };
        assert!(build_sphere(&opts).is_err());
    }
}
