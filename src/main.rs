use std::env;
use std::fs;
use std::process;

use gdnc::generate_assembly;

fn main() {
  let args: Vec<String> = env::args().collect();
  if args.len() < 2 || args.len() > 3 {
    let program = args.first().map(String::as_str).unwrap_or("gdnc");
    eprintln!("usage: {program} <input.gdn> [output.s]");
    process::exit(2);
  }

  let input = &args[1];
  let source = match fs::read_to_string(input) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("{input}: {err}");
      process::exit(3);
    }
  };

  let asm = match generate_assembly(&source) {
    Ok(asm) => asm,
    Err(err) => {
      eprintln!("{input}: {err}");
      process::exit(err.exit_code());
    }
  };

  match args.get(2) {
    Some(output) => {
      if let Err(err) = fs::write(output, asm) {
        eprintln!("{output}: {err}");
        process::exit(3);
      }
    }
    None => print!("{asm}"),
  }
}
